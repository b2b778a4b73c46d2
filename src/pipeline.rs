//! One pipeline invocation, end to end: date filter, subsets, optional
//! jurisdiction filter, tallies, charts.

use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{PipelineError, Result};
use crate::factors::{tally_conditional_factors, tally_factors, ConditionalTally, FactorTally};
use crate::jurisdiction::{
    airport::{merge_identifiers, resolve_airport_identifiers, MergeOp},
    resolve_jurisdiction_identifiers, selected_codes, Selection,
};
use crate::process::{
    self,
    cache::{SnapshotCache, SnapshotParams},
    date_parser::MonthYear,
    filter, subset, PreprocessReport,
};
use crate::render::{
    naming::{self, ArtifactKind},
    Chart, ChartRenderer,
};
use crate::table::RecordTable;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, instrument, warn};

/// A validated generation request.
///
/// Only built through [`GenerateRequest::parse`] and
/// [`GenerateRequest::with_airports`], so an active filter always selects at
/// least one code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    start: MonthYear,
    end: MonthYear,
    /// `Some` means jurisdiction filtering was asked for.
    jurisdictions: Option<Selection>,
    /// `Some` means airport filtering was asked for.
    airports: Option<Selection>,
    /// How airport matches combine with jurisdiction matches.
    merge: MergeOp,
}

impl GenerateRequest {
    /// Validate the raw month (`"01"`–`"12"`) and 4-digit year tokens.
    ///
    /// An explicit selection with no code flagged `true` is rejected here,
    /// before any data is touched.
    pub fn parse(
        start_month: &str,
        start_year: &str,
        end_month: &str,
        end_year: &str,
        jurisdictions: Option<Selection>,
    ) -> Result<Self> {
        let start = MonthYear::parse(start_month, start_year)?;
        let end = MonthYear::parse(end_month, end_year)?;
        if let Some(selection) = &jurisdictions {
            if selected_codes(selection).is_empty() {
                return Err(PipelineError::validation(
                    "jurisdiction filtering is enabled but no jurisdictions are selected",
                ));
            }
        }
        Ok(Self {
            start,
            end,
            jurisdictions,
            airports: None,
            merge: MergeOp::Or,
        })
    }

    /// Also filter by airport, combining with any jurisdiction matches via `merge`.
    pub fn with_airports(mut self, airports: Selection, merge: MergeOp) -> Result<Self> {
        if selected_codes(&airports).is_empty() {
            return Err(PipelineError::validation(
                "airport filtering is enabled but no airports are selected",
            ));
        }
        self.airports = Some(airports);
        self.merge = merge;
        Ok(self)
    }

    pub fn start(&self) -> MonthYear {
        self.start
    }

    pub fn end(&self) -> MonthYear {
        self.end
    }

    pub fn jurisdictions(&self) -> Option<&Selection> {
        self.jurisdictions.as_ref()
    }

    pub fn airports(&self) -> Option<&Selection> {
        self.airports.as_ref()
    }

    pub fn merge(&self) -> MergeOp {
        self.merge
    }

    /// Number of selected jurisdiction and airport codes when filtering.
    pub fn location_count(&self) -> Option<usize> {
        let count = |s: &Option<Selection>| s.as_ref().map(|s| selected_codes(s).len());
        match (count(&self.jurisdictions), count(&self.airports)) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        }
    }
}

/// Headline numbers for one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub date_range: String,
    pub total_records: usize,
    pub locations: Option<usize>,
    pub distinct_contributing_factors: usize,
    pub human_factors_cases: usize,
}

/// Everything one invocation produces apart from rendered files.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutcome {
    pub request: GenerateRequest,
    pub contributing: FactorTally,
    pub human: ConditionalTally,
    pub summary: RunSummary,
    pub diagnostics: Diagnostics,
}

impl PipelineOutcome {
    /// The two charts, contributing factors first.
    pub fn charts(&self) -> [(ArtifactKind, Chart); 2] {
        let locations = self.request.location_count();
        let chart = |kind: ArtifactKind, tally: &crate::factors::FactorCounts, n: usize| {
            Chart::from_counts(
                tally,
                naming::annotation(n),
                naming::chart_title(kind.base_title(), self.request.start(), self.request.end(), locations),
            )
        };
        [
            (
                ArtifactKind::ContributingFactors,
                chart(
                    ArtifactKind::ContributingFactors,
                    &self.contributing.counts,
                    self.contributing.records,
                ),
            ),
            (
                ArtifactKind::HumanFactors,
                chart(
                    ArtifactKind::HumanFactors,
                    &self.human.counts,
                    self.human.marker_count,
                ),
            ),
        ]
    }

    pub fn artifact_name(&self, kind: ArtifactKind, extension: &str) -> String {
        naming::artifact_file_name(
            kind,
            self.request.start(),
            self.request.end(),
            self.request.jurisdictions(),
            self.request.airports(),
            self.request.merge(),
            extension,
        )
    }
}

/// Load and preprocess the configured source, going through the snapshot
/// cache when `cache_dir` is set.
///
/// The cache is best effort: a cache directory that cannot be created or a
/// snapshot that cannot be written is logged and the freshly preprocessed
/// table is returned.
#[instrument(level = "info", skip(config), fields(source = %config.source_path.display()))]
pub fn load_source(config: &PipelineConfig) -> Result<(RecordTable, PreprocessReport)> {
    let params = SnapshotParams {
        minimal_data_threshold: config.minimal_data_threshold,
        date_column: &config.columns.date,
    };
    let cache = config
        .cache_dir
        .as_ref()
        .and_then(|dir| match SnapshotCache::new(dir) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "snapshot cache unavailable");
                None
            }
        });
    if let Some(cache) = &cache {
        if let Some(found) = cache.load(&config.source_path, &params)? {
            return Ok(found);
        }
    }

    let grid = process::load_raw_grid(&config.source_path)?;
    let (table, report) =
        process::preprocess(&grid, config.minimal_data_threshold, &config.columns.date)?;
    if let Some(cache) = &cache {
        if let Err(e) = cache.store(&config.source_path, &params, &table, &report) {
            warn!(error = %e, "failed to write snapshot");
        }
    }
    Ok((table, report))
}

/// Identifiers selected by the request's jurisdiction and airport filters,
/// or `None` when neither filter is active.
///
/// An active filter whose selected codes match no rows is a validation error.
fn resolve_locations(
    request: &GenerateRequest,
    place: &RecordTable,
    config: &PipelineConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Vec<String>>> {
    let by_jurisdiction = request.jurisdictions().map(|selection| {
        resolve_jurisdiction_identifiers(selection, place, &config.columns.jurisdiction, diagnostics)
    });
    let by_airport = request.airports().map(|selection| {
        resolve_airport_identifiers(selection, place, &config.columns.locale, diagnostics)
    });

    let ids = match (by_jurisdiction, by_airport) {
        (None, None) => return Ok(None),
        (Some(ids), None) | (None, Some(ids)) => ids,
        (Some(a), Some(b)) => merge_identifiers(&a, &b, request.merge()),
    };
    if ids.is_empty() {
        return Err(PipelineError::validation(
            "no data found for the selected locations",
        ));
    }
    Ok(Some(ids))
}

/// Run the pipeline over an already preprocessed table.
///
/// The table is only read. The Assessments and Person subsets are cut from
/// the same date-filtered table and always filtered with the same
/// identifier set, so their rows stay aligned for the conditional tally.
#[instrument(level = "info", skip(table, config), fields(start = %request.start(), end = %request.end()))]
pub fn run(
    table: &RecordTable,
    config: &PipelineConfig,
    request: &GenerateRequest,
) -> Result<PipelineOutcome> {
    let mut diagnostics = Diagnostics::new();
    let columns = &config.columns;
    let categories = &config.categories;

    let filtered = filter::filter_date_range(table, &columns.date, request.start(), request.end())?;

    let place = subset::create_subset(&filtered, &categories.place, &mut diagnostics)?;
    let mut assessments =
        subset::create_subset(&filtered, &categories.assessments, &mut diagnostics)?;
    let mut person = subset::create_subset(&filtered, &categories.person, &mut diagnostics)?;

    if let Some(ids) = resolve_locations(request, &place, config, &mut diagnostics)? {
        assessments =
            filter::filter_by_identifiers(&assessments, &ids, "assessments subset", &mut diagnostics)?;
        person = filter::filter_by_identifiers(&person, &ids, "person subset", &mut diagnostics)?;
    }

    let contributing = tally_factors(&assessments, &columns.contributing_factors)?;
    if contributing.counts.is_empty() {
        diagnostics.push(Warning::NoFactors {
            column: columns.contributing_factors.clone(),
        });
    }
    let human = tally_conditional_factors(
        &person,
        &columns.human_factors,
        &assessments,
        &columns.contributing_factors,
        &config.human_factors_marker,
    )?;
    if human.counts.is_empty() {
        diagnostics.push(Warning::NoFactors {
            column: columns.human_factors.clone(),
        });
    }

    let summary = RunSummary {
        date_range: naming::date_range_label(request.start(), request.end()),
        total_records: assessments.num_rows(),
        locations: request.location_count(),
        distinct_contributing_factors: contributing.counts.len(),
        human_factors_cases: human.marker_count,
    };
    info!(?summary, warnings = diagnostics.len(), "pipeline finished");

    Ok(PipelineOutcome {
        request: request.clone(),
        contributing,
        human,
        summary,
        diagnostics,
    })
}

/// Hand both charts to `renderer`, writing into `output_dir`.
pub fn render_outcome(
    outcome: &PipelineOutcome,
    renderer: &dyn ChartRenderer,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    outcome
        .charts()
        .iter()
        .map(|(kind, chart)| {
            let path = output_dir.join(outcome.artifact_name(*kind, renderer.extension()));
            renderer.render(chart, &path)?;
            Ok(path)
        })
        .collect()
}

/// Application state carried between requests: the preprocessed source
/// (loaded once, shared read-only), the last request and its outcome.
pub struct Session {
    config: PipelineConfig,
    source: Option<(Arc<RecordTable>, PreprocessReport)>,
    last_request: Option<GenerateRequest>,
    last_outcome: Option<PipelineOutcome>,
    last_artifacts: Vec<PathBuf>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            source: None,
            last_request: None,
            last_outcome: None,
            last_artifacts: Vec::new(),
        }
    }

    /// Start from an already preprocessed table.
    pub fn with_table(config: PipelineConfig, table: RecordTable) -> Self {
        let mut session = Self::new(config);
        session.source = Some((Arc::new(table), PreprocessReport::default()));
        session
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The preprocessed source, loading it on first use.
    pub fn table(&mut self) -> Result<Arc<RecordTable>> {
        if let Some((table, _)) = &self.source {
            return Ok(Arc::clone(table));
        }
        let (table, report) = load_source(&self.config)?;
        let table = Arc::new(table);
        self.source = Some((Arc::clone(&table), report));
        Ok(table)
    }

    pub fn preprocess_report(&self) -> Option<&PreprocessReport> {
        self.source.as_ref().map(|(_, r)| r)
    }

    /// Run and render one request. On failure the previous outcome is kept.
    pub fn generate(
        &mut self,
        request: GenerateRequest,
        renderer: &dyn ChartRenderer,
    ) -> Result<&PipelineOutcome> {
        let table = self.table()?;
        let mut outcome = run(&table, &self.config, &request)?;
        if let Some(report) = self.preprocess_report() {
            if report.unparseable_dates > 0 {
                outcome.diagnostics.push(Warning::UnparseableDates {
                    count: report.unparseable_dates,
                });
            }
        }
        let artifacts = render_outcome(&outcome, renderer, &self.config.output_dir)?;

        self.last_request = Some(request);
        self.last_artifacts = artifacts;
        Ok(&*self.last_outcome.insert(outcome))
    }

    pub fn last_request(&self) -> Option<&GenerateRequest> {
        self.last_request.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&PipelineOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn last_artifacts(&self) -> &[PathBuf] {
        &self.last_artifacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::convert::normalize_dates;
    use crate::render::JsonChartRenderer;
    use crate::table::test_support::table;
    use tempfile::tempdir;

    const DATE: &str = "Date [Time]";
    const STATE: &str = "State Reference [Place.1]";
    const LOCALE: &str = "Locale Reference [Place]";
    const CF: &str = "Contributing Factors / Situations [Assessments]";
    const HF: &str = "Human Factors [Person 1.7]";

    fn source() -> RecordTable {
        let t = table(&[
            ("ACN", &[Some("1"), Some("2"), Some("3"), Some("4"), Some("5")]),
            (DATE, &[Some("201712"), Some("201801"), Some("201806"), Some("201812"), Some("201901")]),
            (STATE, &[Some("CA"), Some("CA"), Some("TX"), Some("CA"), Some("TX")]),
            (LOCALE, &[Some("LAX.Airport"), Some("SFO.Tower"), Some("IAH.Airport"), Some("LAX.Airport"), None]),
            (
                CF,
                &[
                    Some("Weather"),
                    Some("Human Factors; Weather"),
                    Some("Human Factors"),
                    Some("Aircraft"),
                    Some("Human Factors"),
                ],
            ),
            (HF, &[Some("Fatigue"), Some("Fatigue; Distraction"), Some("Training"), None, Some("Fatigue")]),
        ]);
        normalize_dates(&t, DATE).unwrap().0
    }

    fn selection(pairs: &[(&str, bool)]) -> Selection {
        pairs.iter().map(|(c, b)| (c.to_string(), *b)).collect()
    }

    #[test]
    fn request_validation() {
        assert!(GenerateRequest::parse("01", "2018", "12", "2018", None).is_ok());
        assert!(GenerateRequest::parse("13", "2018", "12", "2018", None).is_err());
        assert!(GenerateRequest::parse("01", "18", "12", "2018", None).is_err());
        let err = GenerateRequest::parse("01", "2018", "12", "2018", Some(selection(&[("CA", false)])))
            .unwrap_err();
        assert!(err.is_user_correctable());
    }

    #[test]
    fn unfiltered_run() -> anyhow::Result<()> {
        let request = GenerateRequest::parse("01", "2018", "12", "2018", None)?;
        let outcome = run(&source(), &PipelineConfig::default(), &request)?;

        assert_eq!(outcome.contributing.records, 3);
        assert_eq!(outcome.contributing.counts.get("Human Factors"), Some(&2));
        assert_eq!(outcome.human.marker_count, 2);
        assert_eq!(outcome.human.counts.get("Fatigue"), Some(&1));
        assert_eq!(outcome.human.counts.get("Training"), Some(&1));
        assert_eq!(outcome.summary.date_range, "Jan 2018 - Dec 2018");
        assert_eq!(outcome.summary.locations, None);
        Ok(())
    }

    #[test]
    fn jurisdiction_filter_keeps_subsets_aligned() -> anyhow::Result<()> {
        let request = GenerateRequest::parse(
            "01",
            "2018",
            "12",
            "2018",
            Some(selection(&[("CA", true), ("TX", false)])),
        )?;
        let outcome = run(&source(), &PipelineConfig::default(), &request)?;

        assert_eq!(outcome.contributing.records, 2);
        assert_eq!(outcome.human.marker_count, 1);
        assert_eq!(outcome.human.counts.get("Distraction"), Some(&1));
        assert_eq!(outcome.human.counts.get("Training"), None);
        assert_eq!(outcome.summary.locations, Some(1));

        let [(_, cf), (_, hf)] = outcome.charts();
        assert_eq!(cf.title, "Contributing Factors / Situations (Jan 2018 - Dec 2018) - 1 Locations");
        assert_eq!(cf.annotation, "n=2");
        assert_eq!(hf.annotation, "n=1");
        assert_eq!(
            outcome.artifact_name(ArtifactKind::HumanFactors, "json"),
            "human_factors_012018-122018_states_1.json"
        );
        Ok(())
    }

    #[test]
    fn airport_filter_merges_with_jurisdictions() -> anyhow::Result<()> {
        let config = PipelineConfig::default();
        let base = || GenerateRequest::parse("01", "2018", "12", "2018", Some(selection(&[("TX", true)])));

        let or = base()?.with_airports(selection(&[("LAX", true)]), MergeOp::Or)?;
        let outcome = run(&source(), &config, &or)?;
        assert_eq!(outcome.contributing.records, 2);
        assert_eq!(outcome.summary.locations, Some(2));

        let and = base()?.with_airports(selection(&[("LAX", true)]), MergeOp::And)?;
        assert!(matches!(run(&source(), &config, &and), Err(PipelineError::Validation(_))));

        assert!(base()?.with_airports(selection(&[("LAX", false)]), MergeOp::Or).is_err());
        Ok(())
    }

    #[test]
    fn failures_are_reported_not_empty() -> anyhow::Result<()> {
        let config = PipelineConfig::default();

        let out_of_range = GenerateRequest::parse("01", "2010", "12", "2010", None)?;
        assert!(matches!(
            run(&source(), &config, &out_of_range),
            Err(PipelineError::Validation(_))
        ));

        let nobody = GenerateRequest::parse("01", "2018", "12", "2018", Some(selection(&[("WA", true)])))?;
        assert!(matches!(
            run(&source(), &config, &nobody),
            Err(PipelineError::Validation(_))
        ));
        Ok(())
    }

    #[test]
    fn session_renders_and_remembers() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = PipelineConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut session = Session::with_table(config, source());

        let request = GenerateRequest::parse("01", "2018", "12", "2018", None)?;
        session.generate(request.clone(), &JsonChartRenderer)?;
        assert_eq!(session.last_request(), Some(&request));
        assert_eq!(session.last_artifacts().len(), 2);
        assert!(dir.path().join("contributing_factors_012018-122018.json").is_file());
        assert!(dir.path().join("human_factors_012018-122018.json").is_file());

        let bad = GenerateRequest::parse("01", "2030", "12", "2030", None)?;
        assert!(session.generate(bad, &JsonChartRenderer).is_err());
        assert_eq!(session.last_request(), Some(&request));
        assert!(session.last_outcome().is_some());
        Ok(())
    }

    const EXTRACT: &str = "\
,Time,Place.1,Assessments,Report 1
ACN,Date,State Reference,Contributing Factors / Situations,Narrative
1,201801,CA,Weather,Runway incursion
2,201802,TX,Weather,
";

    fn cached_config(dir: &Path, threshold: usize) -> anyhow::Result<PipelineConfig> {
        let csv = dir.join("extract.csv");
        if !csv.is_file() {
            std::fs::write(&csv, EXTRACT)?;
        }
        Ok(PipelineConfig {
            source_path: csv,
            cache_dir: Some(dir.join("cache")),
            minimal_data_threshold: threshold,
            ..Default::default()
        })
    }

    #[test]
    fn load_source_uses_snapshot() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = cached_config(dir.path(), 0)?;
        let (first, _) = load_source(&config)?;
        let (second, _) = load_source(&config)?;
        assert_eq!(first.labels(), second.labels());
        assert_eq!(first.num_rows(), 2);
        assert!(std::fs::read_dir(dir.path().join("cache"))?.count() >= 2);
        Ok(())
    }

    #[test]
    fn snapshot_follows_preprocessing_settings() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (loose, _) = load_source(&cached_config(dir.path(), 0)?)?;
        assert!(loose.labels().iter().any(|l| l.starts_with("Narrative")));

        let strict = cached_config(dir.path(), 1)?;
        let (cached, _) = load_source(&strict)?;
        let (fresh, _) = load_source(&PipelineConfig {
            cache_dir: None,
            ..strict.clone()
        })?;
        assert_eq!(cached.labels(), fresh.labels());
        assert!(!cached.labels().iter().any(|l| l.starts_with("Narrative")));
        Ok(())
    }

    #[test]
    fn cache_failures_do_not_fail_the_load() -> anyhow::Result<()> {
        let dir = tempdir()?;

        // cache_dir is a regular file, so the cache cannot be created
        let blocked = PipelineConfig {
            cache_dir: Some(dir.path().join("extract.csv")),
            ..cached_config(dir.path(), 0)?
        };
        let (table, _) = load_source(&blocked)?;
        assert_eq!(table.num_rows(), 2);

        // a directory squatting on the snapshot path makes the write fail
        let config = cached_config(dir.path(), 0)?;
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(&cache_dir)?;
        let params = SnapshotParams {
            minimal_data_threshold: 0,
            date_column: &config.columns.date,
        };
        let key = SnapshotCache::key_for(&config.source_path, &params)?;
        std::fs::create_dir_all(cache_dir.join(format!("{}.parquet", key)))?;
        let (table, _) = load_source(&config)?;
        assert_eq!(table.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn airport_requests_do_not_overwrite_unfiltered_charts() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = PipelineConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut session = Session::with_table(config, source());

        let plain = GenerateRequest::parse("01", "2018", "12", "2018", None)?;
        session.generate(plain, &JsonChartRenderer)?;
        let unfiltered = session.last_artifacts().to_vec();

        let by_airport = GenerateRequest::parse("01", "2018", "12", "2018", None)?
            .with_airports(selection(&[("LAX", true)]), MergeOp::Or)?;
        session.generate(by_airport, &JsonChartRenderer)?;
        let filtered = session.last_artifacts().to_vec();

        assert!(dir.path().join("human_factors_012018-122018_airports_1.json").is_file());
        for path in unfiltered.iter().chain(&filtered) {
            assert!(path.is_file());
        }
        assert!(unfiltered.iter().all(|p| !filtered.contains(p)));
        Ok(())
    }

    #[test]
    fn empty_selections_are_rejected_when_building_the_request() {
        let none_selected = selection(&[("CA", false), ("TX", false)]);
        assert!(matches!(
            GenerateRequest::parse("01", "2018", "12", "2018", Some(none_selected.clone())),
            Err(PipelineError::Validation(_))
        ));
        let request = GenerateRequest::parse("01", "2018", "12", "2018", None).unwrap();
        assert!(matches!(
            request.with_airports(none_selected, MergeOp::And),
            Err(PipelineError::Validation(_))
        ));
    }
}
