use anyhow::{Context, Result};
use asrs_factors::{
    config::PipelineConfig,
    diagnostics::Diagnostics,
    pipeline::load_source,
    process::subset::{create_subsets, ALL_CATEGORIES},
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// Print the column inventory of every category subset of the preprocessed source.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    source: Option<PathBuf>,

    /// Also print each subset's column labels.
    #[arg(long)]
    verbose: bool,
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

    let (table, report) = load_source(&config)
        .with_context(|| format!("failed to load {}", config.source_path.display()))?;

    println!("=== Source: {} ===", config.source_path.display());
    println!("Rows:                   {}", table.num_rows());
    println!("Columns:                {}", table.num_columns());
    println!("Empty columns dropped:  {}", report.empty_columns.len());
    println!(
        "Sparse columns dropped: {} (threshold {})",
        report.minimal_data_columns.len(),
        config.minimal_data_threshold
    );
    println!("Unparseable dates:      {}", report.unparseable_dates);
    println!();

    let mut diagnostics = Diagnostics::new();
    let subsets = create_subsets(&table, ALL_CATEGORIES, &mut diagnostics)?;

    println!("=== Subsets ===");
    for category in ALL_CATEGORIES {
        let Some(subset) = subsets.get(*category) else { continue };
        println!(
            "- {:<12} | columns: {:>3} | identifier: {}",
            category,
            subset.num_columns(),
            if subset.has_identifier() { "yes" } else { "no" }
        );
        if args.verbose {
            for label in subset.labels() {
                println!("    {}", label);
            }
        }
    }

    if !diagnostics.is_empty() {
        println!();
        for warning in diagnostics.warnings() {
            println!("warning: {}", warning);
        }
    }
    Ok(())
}
