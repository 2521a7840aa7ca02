//! strong-csv-to-sqlite - converts an exported strong csv to a sqlite database
//!
//! Exit status is 0 on success; any fatal condition (bad arguments, missing
//! input, dateless row, write failure) exits non-zero with a diagnostic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use strong_common::config::{CliOverrides, ConfigResolver, IdStrategy, MissingDatePolicy};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "strong-csv-to-sqlite")]
#[command(about = "Converts an exported strong csv to a sqlite database")]
#[command(after_help = "EXAMPLE: strong-csv-to-sqlite strong.csv strong.db")]
#[command(version)]
struct Args {
    /// Exported strong csv file
    input_csv: PathBuf,

    /// SQLite database to create
    output_db: PathBuf,

    /// TOML config file (default: <config dir>/strong-csv-to-sqlite/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Field delimiter of the input [default: ;]
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Identifier strategy: random, sequential or content-hash [default: random]
    #[arg(long, value_name = "STRATEGY")]
    id_strategy: Option<IdStrategy>,

    /// Rows without a parseable Date: abort or skip [default: abort]
    #[arg(long, value_name = "POLICY")]
    on_missing_date: Option<MissingDatePolicy>,

    /// Replace the output database if it already exists
    #[arg(short, long)]
    force: bool,

    /// Print the conversion summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "STRONG_LOG_LEVEL")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { args.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting strong-csv-to-sqlite v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let resolver = ConfigResolver::new(CliOverrides {
        config_file: args.config.clone(),
        delimiter: args.delimiter,
        id_strategy: args.id_strategy,
        on_missing_date: args.on_missing_date,
        force: args.force,
    });
    let config = resolver
        .resolve(&args.input_csv, &args.output_db)
        .context("Invalid configuration")?;

    let summary = strong_convert::run(&config).await.with_context(|| {
        format!(
            "Failed to convert {} into {}",
            config.input_path.display(),
            config.output_path.display()
        )
    })?;

    info!(
        "Done: {} rows ({} skipped) -> {} workouts, {} exercises, {} workout exercises, {} sets",
        summary.input_rows,
        summary.skipped_rows,
        summary.workouts,
        summary.exercises,
        summary.workout_exercises,
        summary.sets
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
