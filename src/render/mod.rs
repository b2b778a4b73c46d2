//! Hand-off to chart rendering: the chart description, the renderer seam,
//! and artifact naming and lookup.

pub mod artifacts;
pub mod naming;

use crate::error::Result;
use crate::factors::{sorted_case_insensitive, FactorCounts};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bar {
    pub label: String,
    pub count: usize,
}

/// What a renderer draws: a titled, annotated bar chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chart {
    pub title: String,
    pub annotation: String,
    pub bars: Vec<Bar>,
}

impl Chart {
    /// Bars ordered by label, ignoring case.
    pub fn from_counts(counts: &FactorCounts, annotation: String, title: String) -> Self {
        let bars = sorted_case_insensitive(counts)
            .into_iter()
            .map(|(label, count)| Bar { label, count })
            .collect();
        Self {
            title,
            annotation,
            bars,
        }
    }
}

/// Turns a [`Chart`] into a file. Given the same chart, an implementation
/// must write the same bytes.
pub trait ChartRenderer {
    /// File extension of the artifacts this renderer writes, without the dot.
    fn extension(&self) -> &str;

    fn render(&self, chart: &Chart, path: &Path) -> Result<()>;
}

/// Writes the chart description as pretty JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonChartRenderer;

impl ChartRenderer for JsonChartRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, chart: &Chart, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(chart)?)?;
        info!(path = %path.display(), bars = chart.bars.len(), "rendered chart");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_render_is_deterministic() -> anyhow::Result<()> {
        let counts: FactorCounts = [("weather".to_string(), 2), ("Airport".to_string(), 1)]
            .into_iter()
            .collect();
        let chart = Chart::from_counts(&counts, "n=3".into(), "Test".into());
        assert_eq!(chart.bars[0].label, "Airport");

        let dir = tempdir()?;
        let a = dir.path().join("a.json");
        let b = dir.path().join("nested/b.json");
        JsonChartRenderer.render(&chart, &a)?;
        JsonChartRenderer.render(&chart, &b)?;
        assert_eq!(fs::read(&a)?, fs::read(&b)?);

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&a)?)?;
        assert_eq!(value["annotation"], "n=3");
        assert_eq!(value["bars"][1]["count"], 2);
        Ok(())
    }
}
