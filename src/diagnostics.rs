use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Non-fatal conditions noticed while running the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A category subset matched no columns besides the identifier.
    EmptySubset { category: String },
    /// An identifier filter was asked to filter a table without the identifier column.
    MissingIdentifier { context: String },
    /// A resolver could not find a column it needs.
    MissingColumn { column: String, context: String },
    /// Resolution produced no identifiers.
    NoMatches { context: String },
    /// Date values that did not parse as `YYYYMM`.
    UnparseableDates { count: usize },
    /// The factor tally found no factors at all.
    NoFactors { column: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptySubset { category } => {
                write!(f, "no columns found for category '{}'", category)
            }
            Warning::MissingIdentifier { context } => {
                write!(f, "identifier column not found in {}", context)
            }
            Warning::MissingColumn { column, context } => {
                write!(f, "'{}' column not found in {}", column, context)
            }
            Warning::NoMatches { context } => write!(f, "no identifiers matched for {}", context),
            Warning::UnparseableDates { count } => {
                write!(f, "{} date values could not be parsed", count)
            }
            Warning::NoFactors { column } => write!(f, "no factors found in '{}'", column),
        }
    }
}

/// Warnings collected over one invocation. Pushing also logs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }
}
