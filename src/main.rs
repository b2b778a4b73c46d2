use anyhow::{Context, Result};
use asrs_factors::{
    config::PipelineConfig,
    diagnostics::Diagnostics,
    jurisdiction::{self, airport::MergeOp, Preset, Selection},
    pipeline::{GenerateRequest, Session},
    process::subset,
    render::{artifacts, ChartRenderer, JsonChartRenderer},
    table::RecordTable,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetArg {
    All,
    UsStates,
    NorthAmerica,
}

impl From<PresetArg> for Preset {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::All => Preset::All,
            PresetArg::UsStates => Preset::UsStatesOnly,
            PresetArg::NorthAmerica => Preset::NorthAmerica,
        }
    }
}

/// Tally contributing and human factors for a date range and render both charts.
#[derive(Parser, Debug)]
#[command(name = "asrs_factors", version)]
struct Args {
    /// YAML config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source extract (.csv or .zip).
    #[arg(long)]
    source: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep a parquet snapshot of the preprocessed source here.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Two-digit month, 01-12.
    #[arg(long)]
    start_month: String,

    /// Four-digit year.
    #[arg(long)]
    start_year: String,

    #[arg(long)]
    end_month: String,

    #[arg(long)]
    end_year: String,

    /// Comma-separated jurisdiction codes to keep, e.g. `CA,WA`.
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["states_json", "preset"])]
    states: Vec<String>,

    /// Full selection map as JSON, e.g. `{"CA":true,"TX":false}`.
    #[arg(long, conflicts_with = "preset")]
    states_json: Option<String>,

    /// Select jurisdictions by group.
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Comma-separated airport codes to keep, e.g. `LAX,SFO`.
    #[arg(long, value_delimiter = ',')]
    airports: Vec<String>,

    /// How airport matches combine with jurisdiction matches: AND or OR.
    #[arg(long, default_value = "OR")]
    merge: String,

    /// List rendered artifacts in the output directory after the run.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())
        .context("failed to load config")?;
    if let Some(source) = &args.source {
        config.source_path = source.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    info!(source = %config.source_path.display(), "startup");

    let mut session = Session::new(config);
    let table = session.table().context("failed to load source")?;

    let jurisdictions = jurisdiction_selection(&args, &table, session.config())?;
    let mut request = GenerateRequest::parse(
        &args.start_month,
        &args.start_year,
        &args.end_month,
        &args.end_year,
        jurisdictions,
    )?;
    if !args.airports.is_empty() {
        let merge: MergeOp = args.merge.parse()?;
        let airports: Selection = args.airports.iter().map(|c| (c.trim().to_string(), true)).collect();
        request = request.with_airports(airports, merge)?;
    }

    let renderer = JsonChartRenderer;
    let outcome = match session.generate(request, &renderer) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, correctable = e.is_user_correctable(), "generation failed");
            return Err(e.into());
        }
    };
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    for warning in outcome.diagnostics.warnings() {
        println!("warning: {}", warning);
    }

    for path in session.last_artifacts() {
        info!(path = %path.display(), "artifact");
    }
    if args.list {
        let dir = &session.config().output_dir;
        for name in artifacts::list_artifacts(dir, renderer.extension())? {
            println!("{}", name);
        }
    }
    Ok(())
}

/// Build the selection map from whichever of `--states`, `--states-json`, or
/// `--preset` was given. `None` means no jurisdiction filter.
fn jurisdiction_selection(
    args: &Args,
    table: &RecordTable,
    config: &PipelineConfig,
) -> Result<Option<Selection>> {
    if let Some(json) = &args.states_json {
        let selection: Selection =
            serde_json::from_str(json).context("--states-json must be an object of code -> bool")?;
        return Ok(Some(selection));
    }
    if args.states.is_empty() && args.preset.is_none() {
        return Ok(None);
    }

    let mut scratch = Diagnostics::new();
    let place = subset::create_subset(table, &config.categories.place, &mut scratch)?;
    let available = jurisdiction::available_jurisdictions(&place, &config.columns.jurisdiction);

    if let Some(preset) = args.preset {
        return Ok(Some(jurisdiction::preset_selection(&available, preset.into())));
    }
    let mut selection: Selection = available.into_iter().map(|c| (c, false)).collect();
    for code in &args.states {
        selection.insert(code.trim().to_string(), true);
    }
    Ok(Some(selection))
}
