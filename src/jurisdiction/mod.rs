pub mod airport;
pub mod catalog;

pub use catalog::JurisdictionKind;

use crate::diagnostics::{Diagnostics, Warning};
use crate::table::{RecordTable, IDENTIFIER};
use arrow::array::Array;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Code → selected flag, as sent by the caller.
pub type Selection = BTreeMap<String, bool>;

/// Codes flagged `true`, in key order.
pub fn selected_codes(selection: &Selection) -> Vec<&str> {
    selection
        .iter()
        .filter(|(_, &on)| on)
        .map(|(code, _)| code.as_str())
        .collect()
}

/// Identifiers of every row in `place` whose `jurisdiction_column` value is a
/// selected code, in row order. Duplicates are kept.
///
/// A missing jurisdiction or identifier column yields an empty list and a
/// warning; so does a selection that matches nothing. Whether an empty result
/// is fatal is the caller's call.
pub fn resolve_jurisdiction_identifiers(
    selection: &Selection,
    place: &RecordTable,
    jurisdiction_column: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let Some(codes) = place.text_column(jurisdiction_column) else {
        diagnostics.push(Warning::MissingColumn {
            column: jurisdiction_column.to_string(),
            context: "place subset".to_string(),
        });
        debug!(available = ?place.labels(), "place subset columns");
        return Vec::new();
    };
    let Some(ids) = place.text_column(IDENTIFIER) else {
        diagnostics.push(Warning::MissingIdentifier {
            context: "place subset".to_string(),
        });
        return Vec::new();
    };

    let wanted: HashSet<&str> = selected_codes(selection).into_iter().collect();
    info!(
        "Starting state filtering with {} states in filter, {} selected, {} rows",
        selection.len(),
        wanted.len(),
        place.num_rows()
    );

    let matched: Vec<String> = (0..codes.len())
        .filter(|&i| codes.is_valid(i) && ids.is_valid(i) && wanted.contains(codes.value(i)))
        .map(|i| ids.value(i).to_string())
        .collect();

    info!("Found {} ACNs from selected states", matched.len());
    if matched.is_empty() {
        diagnostics.push(Warning::NoMatches {
            context: "jurisdiction selection".to_string(),
        });
    } else {
        debug!(sample = ?&matched[..matched.len().min(5)], "sample ACNs");
    }
    matched
}

/// Distinct non-missing jurisdiction codes present in `place`, sorted.
pub fn available_jurisdictions(place: &RecordTable, jurisdiction_column: &str) -> Vec<String> {
    place
        .text_column(jurisdiction_column)
        .map(|codes| {
            codes
                .iter()
                .flatten()
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
        .unwrap_or_default()
}

/// Codes bucketed by kind, each bucket sorted.
pub fn group_by_kind(codes: &[String]) -> BTreeMap<JurisdictionKind, Vec<String>> {
    let mut groups: BTreeMap<JurisdictionKind, Vec<String>> = BTreeMap::new();
    for code in codes {
        groups
            .entry(JurisdictionKind::of(code))
            .or_default()
            .push(code.clone());
    }
    for bucket in groups.values_mut() {
        bucket.sort();
    }
    groups
}

/// Quick selections over the codes present in the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    All,
    UsStatesOnly,
    NorthAmerica,
}

impl Preset {
    fn includes(&self, kind: JurisdictionKind) -> bool {
        match self {
            Preset::All => true,
            Preset::UsStatesOnly => kind == JurisdictionKind::UsState,
            Preset::NorthAmerica => kind.is_north_american(),
        }
    }
}

/// A full selection map over `available`, flagged according to `preset`.
pub fn preset_selection(available: &[String], preset: Preset) -> Selection {
    available
        .iter()
        .map(|code| (code.clone(), preset.includes(JurisdictionKind::of(code))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::table;

    const STATE: &str = "State Reference [Place.1]";

    fn place() -> RecordTable {
        table(&[
            (STATE, &[Some("CA"), Some("TX"), None, Some("CA"), Some("ON")]),
            ("ACN", &[Some("10"), Some("11"), Some("12"), Some("13"), Some("14")]),
        ])
    }

    fn selection(pairs: &[(&str, bool)]) -> Selection {
        pairs.iter().map(|(c, b)| (c.to_string(), *b)).collect()
    }

    #[test]
    fn only_true_flags_match() {
        let mut diags = Diagnostics::new();
        let ids = resolve_jurisdiction_identifiers(
            &selection(&[("CA", true), ("TX", false)]),
            &place(),
            STATE,
            &mut diags,
        );
        assert_eq!(ids, vec!["10", "13"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_codes_and_missing_columns_yield_nothing() {
        let mut diags = Diagnostics::new();
        let ids = resolve_jurisdiction_identifiers(&selection(&[("ZZ", true)]), &place(), STATE, &mut diags);
        assert!(ids.is_empty());
        assert_eq!(diags.len(), 1);

        let no_state = table(&[("ACN", &[Some("1")])]);
        let ids = resolve_jurisdiction_identifiers(&selection(&[("CA", true)]), &no_state, STATE, &mut diags);
        assert!(ids.is_empty());

        let no_id = table(&[(STATE, &[Some("CA")])]);
        let ids = resolve_jurisdiction_identifiers(&selection(&[("CA", true)]), &no_id, STATE, &mut diags);
        assert!(ids.is_empty());
        assert_eq!(diags.len(), 3);
    }

    #[test]
    fn available_codes_and_presets() {
        let codes = available_jurisdictions(&place(), STATE);
        assert_eq!(codes, vec!["CA", "ON", "TX"]);

        let us = preset_selection(&codes, Preset::UsStatesOnly);
        assert_eq!(selected_codes(&us), vec!["CA", "TX"]);
        let na = preset_selection(&codes, Preset::NorthAmerica);
        assert_eq!(selected_codes(&na), vec!["CA", "ON", "TX"]);

        let groups = group_by_kind(&codes);
        assert_eq!(groups[&JurisdictionKind::UsState], vec!["CA", "TX"]);
        assert_eq!(groups[&JurisdictionKind::CanadianProvince], vec!["ON"]);
    }
}
