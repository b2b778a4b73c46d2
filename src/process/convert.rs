use crate::error::{PipelineError, Result};
use crate::process::date_parser;
use crate::table::RecordTable;
use arrow::{
    array::{Array, ArrayRef, Date32Builder, StringArray},
    datatypes::DataType,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Convert `date_column` from `YYYYMM` text into `Date32` (first of the month).
///
/// Values that do not parse become missing rather than failing; the number of
/// missing dates after conversion is returned. A column that is already
/// `Date32` is left untouched, so normalizing twice is a no-op.
#[tracing::instrument(level = "info", skip(table))]
pub fn normalize_dates(table: &RecordTable, date_column: &str) -> Result<(RecordTable, usize)> {
    let column = table.column(date_column).ok_or_else(|| {
        PipelineError::structural(format!("{} column not found in dataframe", date_column))
    })?;

    if column.data_type() == &DataType::Date32 {
        return Ok((table.clone(), column.null_count()));
    }

    let text = column
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            PipelineError::structural(format!(
                "{} has type {}, expected text",
                date_column,
                column.data_type()
            ))
        })?;

    let mut builder = Date32Builder::with_capacity(text.len());
    for value in text.iter() {
        let parsed = value
            .and_then(date_parser::parse_yyyymm)
            .map(date_parser::date_to_days);
        builder.append_option(parsed);
    }
    let converted = builder.finish();
    let missing = converted.null_count();

    if missing > 0 {
        warn!(
            "{} date values could not be parsed and were set to missing",
            missing
        );
    }
    let (min, max) = converted
        .iter()
        .flatten()
        .fold((None, None), |(lo, hi): (Option<i32>, Option<i32>), d| {
            (
                Some(lo.map_or(d, |l| l.min(d))),
                Some(hi.map_or(d, |h| h.max(d))),
            )
        });
    info!(
        min = ?min.and_then(date_parser::days_to_date),
        max = ?max.and_then(date_parser::days_to_date),
        "converted dates"
    );

    let table = table.with_column(date_column, Arc::new(converted) as ArrayRef)?;
    Ok((table, missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{test_support::table, Cell};
    use chrono::NaiveDate;

    #[test]
    fn unparseable_values_become_missing() -> anyhow::Result<()> {
        let t = table(&[
            ("ACN", &[Some("1"), Some("2"), Some("3"), Some("4")]),
            ("Date [Time]", &[Some("201801"), Some("oops"), None, Some("201912")]),
        ]);
        let (n, missing) = normalize_dates(&t, "Date [Time]")?;
        assert_eq!(missing, 2);
        assert_eq!(
            n.cell(0, "Date [Time]"),
            Cell::Date(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap())
        );
        assert!(n.cell(1, "Date [Time]").is_missing());
        assert_eq!(n.labels(), t.labels());
        Ok(())
    }

    #[test]
    fn normalizing_twice_is_a_no_op() -> anyhow::Result<()> {
        let t = table(&[("Date [Time]", &[Some("201801"), Some("x")])]);
        let (once, m1) = normalize_dates(&t, "Date [Time]")?;
        let (twice, m2) = normalize_dates(&once, "Date [Time]")?;
        assert_eq!(once, twice);
        assert_eq!(m1, m2);
        Ok(())
    }

    #[test]
    fn missing_date_column_is_structural() {
        let t = table(&[("ACN", &[Some("1")])]);
        assert!(matches!(
            normalize_dates(&t, "Date [Time]"),
            Err(PipelineError::Structural(_))
        ));
    }
}
