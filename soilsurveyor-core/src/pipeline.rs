//! End-to-end profiling run.
//!
//! discover -> load -> failure-limit check -> union -> canonical mapping ->
//! configuration checks -> analysis -> emit. Nothing is written until every
//! earlier stage has succeeded, so a configuration error leaves the output
//! directory untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ProfileConfig;
use crate::emit::ProfileEmitter;
use crate::error::{Result, SurveyorError};
use crate::models::{LoadFailure, UnifiedTable};
use crate::profile::{Diagnostics, ProfileAnalyzer, ProfileReport};
use crate::reconcile::{
    LoadOptions, build_unified_table, list_csv_files, load_sources, with_canonical_columns,
};

/// Result of schema reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Unified table, including canonical columns
    pub table: UnifiedTable,
    /// Files found under the input directory
    pub files_discovered: usize,
    /// Directories and files that could not be loaded
    pub load_failures: Vec<LoadFailure>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Artifacts written, in write order
    pub artifacts: Vec<PathBuf>,
    /// Analysis results
    pub report: ProfileReport,
    /// Run-level diagnostics (also written as JSON)
    pub diagnostics: Diagnostics,
}

/// Discovers, loads and unions every CSV file under `input_dir`.
///
/// Fails with [`SurveyorError::TooManyLoadFailures`] when the configured
/// failure limit is exceeded.
pub async fn reconcile_sources(input_dir: &Path, config: &ProfileConfig) -> Result<Reconciled> {
    config.validate()?;

    let discovered = list_csv_files(input_dir)?;
    let files = discovered.files;
    tracing::info!(
        "Discovered {} CSV files under {}",
        files.len(),
        input_dir.display()
    );

    let options = Arc::new(LoadOptions {
        null_sentinels: config.null_sentinels.clone(),
        signatures: config.signatures.clone(),
    });
    let (loaded, file_failures) =
        load_sources(&files, input_dir, options, config.load_concurrency).await;

    // Unreadable directories count against the failure limit like files
    let mut load_failures = discovered.unreadable;
    load_failures.extend(file_failures);

    if let Some(limit) = config.max_load_failures
        && load_failures.len() > limit
    {
        return Err(SurveyorError::TooManyLoadFailures {
            failed: load_failures.len(),
            limit,
        });
    }

    let table = build_unified_table(loaded);
    let table = with_canonical_columns(&table, &config.column_mappings)?;

    Ok(Reconciled {
        table,
        files_discovered: files.len(),
        load_failures,
    })
}

/// Builds the diagnostics report for a reconciled and analyzed run.
pub fn build_diagnostics(reconciled: &Reconciled, report: &ProfileReport) -> Diagnostics {
    let mut schema_versions = BTreeMap::new();
    for source in reconciled.table.sources() {
        *schema_versions.entry(source.schema_version).or_insert(0) += 1;
    }

    Diagnostics {
        files_discovered: reconciled.files_discovered,
        files_loaded: reconciled.table.sources().len(),
        load_failures: reconciled.load_failures.clone(),
        rows: reconciled.table.row_count(),
        columns: reconciled.table.columns().len(),
        schema_versions,
        full_row_duplicate_groups: report.full_row_duplicates.len(),
        key_duplicate_groups: report.key_duplicates.as_ref().map(Vec::len),
        outlier_records: report.outliers.len(),
        correlated_columns: report.correlation.matrix.columns.len(),
        insufficient_data: report.warnings.clone(),
    }
}

/// Runs the full pipeline and writes artifacts into `output_dir`.
pub async fn run(input_dir: &Path, output_dir: &Path, config: ProfileConfig) -> Result<RunSummary> {
    tracing::info!("Starting profiling run for {}", input_dir.display());

    let reconciled = reconcile_sources(input_dir, &config).await?;
    let table = Arc::new(reconciled.table.clone());

    let analyzer = ProfileAnalyzer::new(config);
    let report = analyzer.analyze_concurrent(Arc::clone(&table)).await?;
    let diagnostics = build_diagnostics(&reconciled, &report);

    let emitter = ProfileEmitter::new(output_dir);
    let artifacts = {
        let (table, report, diagnostics) = (table, report.clone(), diagnostics.clone());
        tokio::task::spawn_blocking(move || emitter.emit(&table, &report, &diagnostics))
            .await
            .map_err(|e| SurveyorError::task("artifact emission", e))??
    };

    tracing::info!(
        "Profiled {} rows from {} sources ({} load failures)",
        diagnostics.rows,
        diagnostics.files_loaded,
        diagnostics.load_failures.len()
    );

    Ok(RunSummary {
        artifacts,
        report,
        diagnostics,
    })
}
