use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{PipelineError, Result};
use crate::process::date_parser::{date_to_days, MonthYear};
use crate::table::{RecordTable, IDENTIFIER};
use arrow::array::BooleanArray;
use std::collections::HashSet;
use tracing::info;

/// Keep rows whose normalized date lies in `[start, end]`, both inclusive at
/// month granularity. Rows with a missing date are dropped.
///
/// An empty result is a validation error ("no data in range"). Bounds are
/// never swapped, so `start > end` always ends up there.
#[tracing::instrument(level = "info", skip(table), fields(start = %start, end = %end))]
pub fn filter_date_range(
    table: &RecordTable,
    date_column: &str,
    start: MonthYear,
    end: MonthYear,
) -> Result<RecordTable> {
    let dates = table.date_column(date_column).ok_or_else(|| {
        PipelineError::structural(format!(
            "{} column not found in dataframe or not normalized",
            date_column
        ))
    })?;

    let lo = date_to_days(start.first_day());
    let hi = date_to_days(end.first_day());
    let mask: BooleanArray = dates
        .iter()
        .map(|d| Some(d.map_or(false, |d| d >= lo && d <= hi)))
        .collect();

    let total = table.num_rows();
    let filtered = table.select_rows(&mask)?;
    let kept = filtered.num_rows();
    info!(
        "Data filtered: {} records kept out of {} ({:.1}%)",
        kept,
        total,
        if total == 0 { 0.0 } else { kept as f64 * 100.0 / total as f64 }
    );

    if kept == 0 {
        return Err(PipelineError::validation(format!(
            "no data found for the date range {} - {}",
            start, end
        )));
    }
    Ok(filtered)
}

/// Keep the rows whose identifier is in `ids`, preserving source order.
///
/// A table without the identifier column comes back unchanged, with a warning.
pub fn filter_by_identifiers<S: AsRef<str>>(
    table: &RecordTable,
    ids: &[S],
    context: &str,
    diagnostics: &mut Diagnostics,
) -> Result<RecordTable> {
    let Some(column) = table.text_column(IDENTIFIER) else {
        diagnostics.push(Warning::MissingIdentifier {
            context: context.to_string(),
        });
        return Ok(table.clone());
    };

    let wanted: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
    let mask: BooleanArray = column
        .iter()
        .map(|v| Some(v.map_or(false, |v| wanted.contains(v))))
        .collect();
    let filtered = table.select_rows(&mask)?;
    info!(
        context,
        before = table.num_rows(),
        identifiers = wanted.len(),
        after = filtered.num_rows(),
        "identifier filter"
    );
    debug_assert_eq!(filtered.num_rows(), mask.true_count());
    Ok(filtered)
}
