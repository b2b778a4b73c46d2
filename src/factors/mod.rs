//! Frequency tallies over `;`-separated factor lists.

use crate::error::{PipelineError, Result};
use crate::table::{RecordTable, IDENTIFIER};
use arrow::array::{Array, StringArray};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Factor name (trimmed, case preserved) → number of records naming it.
pub type FactorCounts = BTreeMap<String, usize>;

/// Result of [`tally_factors`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FactorTally {
    pub counts: FactorCounts,
    /// Rows whose factor cell was missing.
    pub none_count: usize,
    /// Rows examined.
    pub records: usize,
}

/// Result of [`tally_conditional_factors`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConditionalTally {
    pub counts: FactorCounts,
    /// Rows whose gating cell contained the marker.
    pub marker_count: usize,
    /// Marker rows whose tallied cell was missing.
    pub eligible_but_empty: usize,
}

/// Split one cell on `;` and bump each trimmed token once.
fn add_tokens(counts: &mut FactorCounts, cell: &str) {
    for token in cell.split(';') {
        *counts.entry(token.trim().to_string()).or_insert(0) += 1;
    }
}

fn require_text<'a>(table: &'a RecordTable, column: &str) -> Result<&'a StringArray> {
    table.text_column(column).ok_or_else(|| {
        PipelineError::structural(format!("'{}' column not found or not text", column))
    })
}

/// Count every factor named in `column`.
///
/// Missing cells go to `none_count`. Tokens are only trimmed: a cell like
/// `"A;"` counts both `"A"` and `""`.
pub fn tally_factors(table: &RecordTable, column: &str) -> Result<FactorTally> {
    let values = require_text(table, column)?;
    let mut tally = FactorTally {
        records: values.len(),
        ..Default::default()
    };
    for cell in values.iter() {
        match cell {
            Some(cell) => add_tokens(&mut tally.counts, cell),
            None => tally.none_count += 1,
        }
    }
    info!("No contributing factors found for {} records", tally.none_count);
    info!(
        "{} records have contributing factors",
        tally.records - tally.none_count
    );
    Ok(tally)
}

/// Rows of two tables derived from the same parent must line up one to one.
fn check_alignment(a: &RecordTable, b: &RecordTable) -> Result<()> {
    if a.num_rows() != b.num_rows() {
        return Err(PipelineError::structural(format!(
            "subsets are not aligned: {} rows vs {} rows",
            a.num_rows(),
            b.num_rows()
        )));
    }
    if let (Some(x), Some(y)) = (a.text_column(IDENTIFIER), b.text_column(IDENTIFIER)) {
        if let Some(row) = (0..x.len()).find(|&i| x.is_valid(i) && y.is_valid(i) && x.value(i) != y.value(i)) {
            return Err(PipelineError::structural(format!(
                "subsets are not aligned at row {}: {} vs {}",
                row,
                x.value(row),
                y.value(row)
            )));
        }
    }
    Ok(())
}

/// Tally `person_column` of `person` only on rows whose `gate_column` in
/// `gate` contains `marker`.
///
/// Both tables must share row positions (same parent, same filters). Rows
/// with a missing gate cell never qualify; qualifying rows with a missing
/// person cell are counted in `eligible_but_empty` and skipped.
pub fn tally_conditional_factors(
    person: &RecordTable,
    person_column: &str,
    gate: &RecordTable,
    gate_column: &str,
    marker: &str,
) -> Result<ConditionalTally> {
    check_alignment(person, gate)?;
    let gates = require_text(gate, gate_column)?;
    let person_values = require_text(person, person_column)?;

    let mut tally = ConditionalTally::default();
    for (gate_cell, person_cell) in gates.iter().zip(person_values.iter()) {
        let Some(gate_cell) = gate_cell else { continue };
        if !gate_cell.contains(marker) {
            continue;
        }
        tally.marker_count += 1;
        match person_cell {
            Some(cell) => add_tokens(&mut tally.counts, cell),
            None => tally.eligible_but_empty += 1,
        }
    }
    info!("No human factors found for {} records", tally.eligible_but_empty);
    info!(
        "{} records have human factors",
        tally.marker_count - tally.eligible_but_empty
    );
    Ok(tally)
}

/// Entries ordered by factor name, ignoring case; the order bars are drawn in.
pub fn sorted_case_insensitive(counts: &FactorCounts) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
    entries
}
