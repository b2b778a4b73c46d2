use crate::error::{PipelineError, Result};
use crate::process::raw_table::RawGrid;
use crate::table::{label, text_array, RecordTable, IDENTIFIER};
use std::collections::HashSet;
use tracing::{debug, info};

/// Turn the two metadata rows into composite labels and the remaining rows
/// into a [`RecordTable`].
///
/// Row 0 supplies categories, row 1 field names; missing values in either are
/// read as empty strings. A first column labelled `"ACN []"` or `" []"` is
/// renamed to the canonical identifier. If no column ends up named `ACN`,
/// the first column's data is appended under that name so the identifier is
/// never lost. Duplicate labels get a `.N` suffix on the field part.
#[tracing::instrument(level = "info", skip(grid))]
pub fn fuse_headers(grid: &RawGrid) -> Result<RecordTable> {
    if grid.num_rows() < 2 {
        return Err(PipelineError::structural(
            "not enough rows to set header (needs at least 2 rows)",
        ));
    }

    let width = grid.num_columns();
    let mut labels = Vec::with_capacity(width);
    let mut seen = HashSet::with_capacity(width);
    for col in 0..width {
        let category = grid.get(0, col).unwrap_or("");
        let field = grid.get(1, col).unwrap_or("");
        let mut fused = label::fuse(field, category);
        if col == 0 && (fused == label::fuse(IDENTIFIER, "") || fused == label::fuse("", "")) {
            fused = IDENTIFIER.to_string();
        }
        let mut candidate = fused.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = label::fuse(&format!("{}.{}", field, n), category);
            n += 1;
        }
        if candidate != fused {
            debug!(label = %fused, renamed = %candidate, "duplicate column label");
        }
        labels.push(candidate);
    }

    let data = &grid.rows[2..];
    let column_values = |col: usize| {
        data.iter()
            .map(move |row| row.get(col).and_then(|c| c.as_deref()))
    };

    let mut columns = Vec::with_capacity(width + 1);
    for (col, name) in labels.iter().enumerate() {
        columns.push((name.clone(), text_array(column_values(col))));
    }
    if !labels.iter().any(|l| l == IDENTIFIER) && width > 0 {
        debug!("identifier label not recovered from header, using first column");
        columns.push((IDENTIFIER.to_string(), text_array(column_values(0))));
    }

    let table = RecordTable::from_columns(columns, data.len())?;
    info!(
        columns = table.num_columns(),
        rows = table.num_rows(),
        identifier = table.has_identifier(),
        "header set"
    );
    Ok(table)
}
