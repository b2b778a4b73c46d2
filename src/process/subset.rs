use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::table::{label, RecordTable};
use std::collections::BTreeMap;
use tracing::info;

/// Every category the source schema groups its fields under.
pub const ALL_CATEGORIES: &[&str] = &[
    "Time",
    "Place",
    "Environment",
    "Aircraft 1",
    "Component",
    "Aircraft 2",
    "Person 1",
    "Person 2",
    "Events",
    "Assessments",
    "Report 1",
    "Report 2",
];

/// Columns whose bracket segment contains `category`, plus the identifier.
///
/// Labels without both brackets are skipped. Matching is plain substring
/// containment, so `"Place"` also picks up `"Place.1"`.
pub fn create_subset(
    table: &RecordTable,
    category: &str,
    diagnostics: &mut Diagnostics,
) -> Result<RecordTable> {
    let indices: Vec<usize> = table
        .labels()
        .iter()
        .enumerate()
        .filter(|(_, l)| label::in_category(l, category))
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        diagnostics.push(Warning::EmptySubset {
            category: category.to_string(),
        });
    }

    let subset = table.project_preserving_identifier(&indices)?;
    info!(
        category,
        columns = subset.num_columns(),
        identifier = subset.has_identifier(),
        "created subset"
    );
    Ok(subset)
}

/// One subset per entry of `categories`, keyed by category name.
pub fn create_subsets(
    table: &RecordTable,
    categories: &[&str],
    diagnostics: &mut Diagnostics,
) -> Result<BTreeMap<String, RecordTable>> {
    categories
        .iter()
        .map(|c| Ok((c.to_string(), create_subset(table, c, diagnostics)?)))
        .collect()
}
