use crate::jurisdiction::{airport::MergeOp, selected_codes, Selection};
use crate::process::date_parser::MonthYear;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

/// `"Jan 2018 - Dec 2018"`
pub fn date_range_label(start: MonthYear, end: MonthYear) -> String {
    format!(
        "{} {} - {} {}",
        month_name(start.month),
        start.year_token(),
        month_name(end.month),
        end.year_token()
    )
}

/// `"<base> (Jan 2018 - Dec 2018)"`, plus `" - <n> Locations"` when a
/// jurisdiction filter is active.
pub fn chart_title(base: &str, start: MonthYear, end: MonthYear, locations: Option<usize>) -> String {
    let mut title = format!("{} ({})", base, date_range_label(start, end));
    if let Some(n) = locations {
        title.push_str(&format!(" - {} Locations", n));
    }
    title
}

pub fn annotation(count: usize) -> String {
    format!("n={}", count)
}

/// The two charts a run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ContributingFactors,
    HumanFactors,
}

impl ArtifactKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::ContributingFactors => "contributing_factors",
            ArtifactKind::HumanFactors => "human_factors",
        }
    }

    pub fn base_title(&self) -> &'static str {
        match self {
            ArtifactKind::ContributingFactors => "Contributing Factors / Situations",
            ArtifactKind::HumanFactors => "Human Factors",
        }
    }
}

/// `"_states_<n>"` when some, but not all, codes in the map are selected.
pub fn selection_suffix(selection: Option<&Selection>) -> String {
    let Some(selection) = selection else {
        return String::new();
    };
    let selected = selected_codes(selection).len();
    if selected > 0 && selected < selection.len() {
        format!("_states_{}", selected)
    } else {
        String::new()
    }
}

/// `"_airports_<n>"` for an active airport filter. With a jurisdiction filter
/// also active, the jurisdiction count and merge operation come first, e.g.
/// `"_states_2_and_airports_1"`.
pub fn location_suffix(
    jurisdictions: Option<&Selection>,
    airports: Option<&Selection>,
    merge: MergeOp,
) -> String {
    let Some(airports) = airports else {
        return selection_suffix(jurisdictions);
    };
    let mut suffix = String::new();
    if let Some(jurisdictions) = jurisdictions {
        let op = match merge {
            MergeOp::And => "and",
            MergeOp::Or => "or",
        };
        suffix.push_str(&format!("_states_{}_{}", selected_codes(jurisdictions).len(), op));
    }
    suffix.push_str(&format!("_airports_{}", selected_codes(airports).len()));
    suffix
}

/// Deterministic artifact file name, e.g.
/// `contributing_factors_012018-122018_states_3.json`.
pub fn artifact_file_name(
    kind: ArtifactKind,
    start: MonthYear,
    end: MonthYear,
    jurisdictions: Option<&Selection>,
    airports: Option<&Selection>,
    merge: MergeOp,
    extension: &str,
) -> String {
    format!(
        "{}_{}{}-{}{}{}.{}",
        kind.prefix(),
        start.month_token(),
        start.year_token(),
        end.month_token(),
        end.year_token(),
        location_suffix(jurisdictions, airports, merge),
        extension
    )
}
