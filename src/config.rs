use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use tracing::info;

/// Designated column labels the pipeline reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub date: String,
    pub jurisdiction: String,
    pub locale: String,
    pub contributing_factors: String,
    pub human_factors: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "Date [Time]".into(),
            jurisdiction: "State Reference [Place.1]".into(),
            locale: "Locale Reference [Place]".into(),
            contributing_factors: "Contributing Factors / Situations [Assessments]".into(),
            human_factors: "Human Factors [Person 1.7]".into(),
        }
    }
}

/// Category names used to cut the subsets the charts need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryNames {
    pub place: String,
    pub assessments: String,
    pub person: String,
}

impl Default for CategoryNames {
    fn default() -> Self {
        Self {
            place: "Place".into(),
            assessments: "Assessments".into(),
            person: "Person 1".into(),
        }
    }
}

/// Everything a run needs besides the request itself.
///
/// Every field has a default, so an empty YAML document is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub minimal_data_threshold: usize,
    pub columns: ColumnNames,
    pub categories: CategoryNames,
    pub human_factors_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("Jan1990_Jan2025.csv"),
            output_dir: PathBuf::from("charts"),
            cache_dir: None,
            minimal_data_threshold: 100,
            columns: ColumnNames::default(),
            categories: CategoryNames::default(),
            human_factors_marker: "Human Factors".into(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Read a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let cfg = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
