use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{PipelineError, Result};
use crate::jurisdiction::Selection;
use crate::table::{RecordTable, IDENTIFIER};
use arrow::array::Array;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Airport codes named by a locale reference such as `"LAX.Airport"` or
/// `"KSFO;SFO"`.
///
/// Text before the first `.` wins; otherwise a `;` splits the value into two
/// codes; otherwise the whole value is the code.
pub fn airport_codes(locale: Option<&str>) -> Vec<&str> {
    let Some(locale) = locale else {
        return Vec::new();
    };
    if let Some(idx) = locale.find('.') {
        vec![&locale[..idx]]
    } else if let Some(idx) = locale.find(';') {
        vec![&locale[..idx], &locale[idx + 1..]]
    } else {
        vec![locale]
    }
}

/// Identifiers of rows whose locale names a selected airport. A row adds its
/// identifier once per matching code, in row order.
pub fn resolve_airport_identifiers(
    selection: &Selection,
    place: &RecordTable,
    locale_column: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let Some(locales) = place.text_column(locale_column) else {
        diagnostics.push(Warning::MissingColumn {
            column: locale_column.to_string(),
            context: "place subset".to_string(),
        });
        return Vec::new();
    };
    let Some(ids) = place.text_column(IDENTIFIER) else {
        diagnostics.push(Warning::MissingIdentifier {
            context: "place subset".to_string(),
        });
        return Vec::new();
    };

    let mut matched = Vec::new();
    for i in 0..locales.len() {
        if ids.is_null(i) {
            continue;
        }
        let locale = locales.is_valid(i).then(|| locales.value(i));
        for code in airport_codes(locale) {
            if selection.get(code).copied().unwrap_or(false) {
                matched.push(ids.value(i).to_string());
            }
        }
    }
    if matched.is_empty() {
        diagnostics.push(Warning::NoMatches {
            context: "airport selection".to_string(),
        });
    }
    matched
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MergeOp {
    And,
    Or,
}

impl FromStr for MergeOp {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(MergeOp::And),
            "OR" => Ok(MergeOp::Or),
            other => Err(PipelineError::validation(format!(
                "invalid merge operation '{}', only 'AND' or 'OR' are accepted",
                other
            ))),
        }
    }
}

/// Combine two identifier lists.
///
/// `And` keeps members of `a` also in `b`, in `a`'s order. `Or` is `a`
/// followed by the members of `b` not already collected.
pub fn merge_identifiers(a: &[String], b: &[String], op: MergeOp) -> Vec<String> {
    match op {
        MergeOp::And => {
            let in_b: HashSet<&str> = b.iter().map(String::as_str).collect();
            a.iter().filter(|id| in_b.contains(id.as_str())).cloned().collect()
        }
        MergeOp::Or => {
            let mut seen: HashSet<&str> = a.iter().map(String::as_str).collect();
            let mut out = a.to_vec();
            for id in b {
                if seen.insert(id.as_str()) {
                    out.push(id.clone());
                }
            }
            out
        }
    }
}
