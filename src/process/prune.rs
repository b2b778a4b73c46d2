use crate::error::Result;
use crate::table::RecordTable;
use arrow::array::Array;
use tracing::{debug, info};

/// Remove every column whose non-missing count is `<= threshold`.
///
/// Retained columns keep their relative order. Returns the pruned table and
/// the removed labels in original column order.
pub fn prune_columns(table: &RecordTable, threshold: usize) -> Result<(RecordTable, Vec<String>)> {
    let batch = table.batch();
    let schema = batch.schema();
    let mut keep = Vec::with_capacity(batch.num_columns());
    let mut removed = Vec::new();

    for (i, field) in schema.fields().iter().enumerate() {
        let col = batch.column(i);
        let count = col.len() - col.null_count();
        if count <= threshold {
            debug!(column = %field.name(), non_null = count, "removing column");
            removed.push(field.name().clone());
        } else {
            keep.push(i);
        }
    }

    Ok((table.project(&keep)?, removed))
}

/// Remove completely empty columns.
pub fn delete_empty_columns(table: &RecordTable) -> Result<(RecordTable, Vec<String>)> {
    let (pruned, removed) = prune_columns(table, 0)?;
    info!("Removing {} empty columns", removed.len());
    Ok((pruned, removed))
}

/// Remove columns with `threshold` or fewer non-missing values.
pub fn delete_minimal_data_columns(
    table: &RecordTable,
    threshold: usize,
) -> Result<(RecordTable, Vec<String>)> {
    let (pruned, removed) = prune_columns(table, threshold)?;
    info!(
        "Removing {} columns with <= {} non-null values",
        removed.len(),
        threshold
    );
    Ok((pruned, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::table;

    fn sample() -> RecordTable {
        table(&[
            ("ACN", &[Some("1"), Some("2"), Some("3")]),
            ("Empty [x]", &[None, None, None]),
            ("One [x]", &[None, Some("a"), None]),
            ("Two [y]", &[Some("a"), None, Some("b")]),
        ])
    }

    #[test]
    fn empty_pass_only_removes_all_missing() -> anyhow::Result<()> {
        let (t, removed) = delete_empty_columns(&sample())?;
        assert_eq!(removed, vec!["Empty [x]"]);
        assert_eq!(t.labels(), vec!["ACN", "One [x]", "Two [y]"]);
        assert_eq!(t.num_rows(), 3);
        Ok(())
    }

    #[test]
    fn threshold_is_inclusive() -> anyhow::Result<()> {
        let (t, removed) = delete_minimal_data_columns(&sample(), 1)?;
        assert_eq!(removed, vec!["Empty [x]", "One [x]"]);
        assert_eq!(t.labels(), vec!["ACN", "Two [y]"]);
        Ok(())
    }

    #[test]
    fn pruned_columns_match_threshold_exactly() -> anyhow::Result<()> {
        let source = sample();
        for threshold in 0..4 {
            let (t, removed) = prune_columns(&source, threshold)?;
            for label in t.labels() {
                assert!(source.non_null_count(&label).unwrap_or(0) > threshold);
            }
            for label in &removed {
                assert!(source.non_null_count(label).unwrap_or(0) <= threshold);
            }
            assert_eq!(t.num_columns() + removed.len(), source.num_columns());
        }
        Ok(())
    }
}
