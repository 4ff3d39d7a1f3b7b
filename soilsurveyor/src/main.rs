//! Soil-test export profiling tool.
//!
//! This binary reconciles a directory of soil-test CSV exports into one
//! table and writes a statistical profile of it: duplicates, missingness,
//! descriptive statistics, outliers and correlations.
//!
//! # Guarantees
//! - Offline batch operation over local files only
//! - No row is dropped, merged or deduplicated
//! - Identical inputs and configuration produce identical artifacts

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use soilsurveyor_core::{ProfileConfig, init_logging, run};
use tracing::{info, warn};

/// Command-line interface.
#[derive(Parser)]
#[command(name = "soilsurveyor")]
#[command(about = "Soil-test CSV reconciliation and profiling tool")]
#[command(version)]
#[command(long_about = "
SoilSurveyor - Soil-test CSV reconciliation and statistical profiling

This tool reads every CSV export under a directory and produces:
- One combined table with explicit absent markers for missing columns
- Missingness counts, completeness tiers and advisory pattern labels
- Descriptive statistics for numeric and categorical columns
- IQR outliers and a Pearson correlation matrix
- Duplicate groups (reported, never removed)
- Top value frequencies and optional per-group numeric summaries

EXAMPLES:
  soilsurveyor profile ./exports -o ./profile
  soilsurveyor profile ./exports -o ./profile --target \"Soil Health Score\"
  soilsurveyor profile ./exports -o ./profile --key-columns \"Lab No,Date Received\"
  soilsurveyor profile ./exports -o ./profile --key-columns \"Lab No\" --absent-matches-absent
  soilsurveyor init-config > soilsurveyor.json
  soilsurveyor check-config soilsurveyor.json
")]
pub struct Cli {
    /// Verbosity flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Reconcile and profile a directory of CSV exports
    Profile(ProfileArgs),
    /// Validate a configuration file and print the effective configuration
    CheckConfig(CheckConfigArgs),
    /// Print the default configuration as JSON
    InitConfig,
}

/// Arguments for `profile`.
#[derive(Args)]
pub struct ProfileArgs {
    /// Input directory
    #[arg(help = "Directory containing CSV exports (searched recursively)")]
    pub input_dir: PathBuf,

    /// Output directory
    #[arg(short, long, help = "Directory the profile artifacts are written to")]
    pub output: PathBuf,

    /// Configuration file
    #[arg(short, long, help = "JSON configuration file")]
    pub config: Option<PathBuf>,

    /// Target column override
    #[arg(long, help = "Numeric column to rank correlation drivers against")]
    pub target: Option<String>,

    /// Duplicate key override
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated key columns for duplicate detection"
    )]
    pub key_columns: Vec<String>,

    /// Missing key values match
    #[arg(
        long,
        help = "Treat two missing key values as equal when grouping key duplicates"
    )]
    pub absent_matches_absent: bool,

    /// Strong correlation threshold override
    #[arg(long, help = "|r| above which a pair is reported as strong (0.0-1.0)")]
    pub strong_threshold: Option<f64>,

    /// Load failure limit override
    #[arg(long, help = "Abort when more than this many files fail to load")]
    pub max_load_failures: Option<usize>,
}

/// Arguments for `check-config`.
#[derive(Args)]
pub struct CheckConfigArgs {
    /// Configuration file
    #[arg(help = "JSON configuration file to validate")]
    pub config: PathBuf,
}

/// Flags shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Profile(args) => profile(args).await,
        Command::CheckConfig(args) => check_config(&args.config),
        Command::InitConfig => init_config(),
    }
}

fn load_config(path: &Path) -> Result<ProfileConfig> {
    ProfileConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Builds the run configuration: file (or defaults), then CLI overrides.
fn effective_config(args: &ProfileArgs) -> Result<ProfileConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProfileConfig::default(),
    };

    if let Some(target) = &args.target {
        config = config.with_target_column(target.clone());
    }
    if !args.key_columns.is_empty() {
        config = config.with_duplicate_key_columns(args.key_columns.iter().cloned());
    }
    if args.absent_matches_absent {
        config = config.with_absent_matches_absent(true);
    }
    if let Some(threshold) = args.strong_threshold {
        config = config.with_strong_correlation_threshold(threshold);
    }
    if let Some(limit) = args.max_load_failures {
        config = config.with_max_load_failures(limit);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Runs the full profile and prints a short summary.
async fn profile(args: &ProfileArgs) -> Result<()> {
    let config = effective_config(args)?;

    info!("Input: {}", args.input_dir.display());
    info!("Output: {}", args.output.display());

    let summary = run(&args.input_dir, &args.output, config)
        .await
        .context("Profiling run failed")?;
    let diagnostics = &summary.diagnostics;

    for failure in &diagnostics.load_failures {
        warn!("Skipped '{}': {}", failure.source, failure.reason);
    }
    for warning in &diagnostics.insufficient_data {
        warn!(
            "Column '{}' excluded from {:?}: {} values, {} required",
            warning.column, warning.analysis, warning.available, warning.required
        );
    }

    println!("Profile completed successfully");
    println!("Output: {}", args.output.display());
    println!(
        "Sources: {} loaded, {} failed",
        diagnostics.files_loaded,
        diagnostics.load_failures.len()
    );
    println!("Rows: {}", diagnostics.rows);
    println!("Columns: {}", diagnostics.columns);
    println!("Outliers: {}", diagnostics.outlier_records);
    println!("Artifacts: {}", summary.artifacts.len());

    Ok(())
}

/// Validates a configuration file and prints the effective configuration.
fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    info!("✓ Configuration is valid");
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn init_config() -> Result<()> {
    println!("{}", ProfileConfig::default().to_json_pretty()?);
    Ok(())
}
