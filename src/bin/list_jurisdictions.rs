use anyhow::{Context, Result};
use asrs_factors::{
    config::PipelineConfig,
    diagnostics::Diagnostics,
    jurisdiction::{available_jurisdictions, group_by_kind},
    pipeline::load_source,
    process::subset::create_subset,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// Print the jurisdiction codes present in the source, grouped by kind.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source extract (.csv or .zip); overrides the config.
    #[arg(long)]
    source: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    if let Some(source) = args.source {
        config.source_path = source;
    }

    let (table, _) = load_source(&config)
        .with_context(|| format!("failed to load {}", config.source_path.display()))?;
    let mut diagnostics = Diagnostics::new();
    let place = create_subset(&table, &config.categories.place, &mut diagnostics)?;
    let codes = available_jurisdictions(&place, &config.columns.jurisdiction);

    if codes.is_empty() {
        println!("No jurisdiction codes found in '{}'.", config.columns.jurisdiction);
        return Ok(());
    }

    println!("=== {} jurisdictions ===", codes.len());
    for (kind, bucket) in group_by_kind(&codes) {
        println!("{:<18} ({:>2}): {}", kind.as_str(), bucket.len(), bucket.join(", "));
    }
    Ok(())
}
