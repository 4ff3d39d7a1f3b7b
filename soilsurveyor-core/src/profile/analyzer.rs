//! Profile analyzer facade.
//!
//! This module provides the `ProfileAnalyzer` that resolves column types,
//! checks the target column and runs every analysis over one read-only
//! [`UnifiedTable`].

use std::sync::Arc;

use crate::Result;
use crate::config::ProfileConfig;
use crate::error::SurveyorError;
use crate::models::UnifiedTable;

use super::columns::{ResolvedKind, profile_columns, resolve_kinds};
use super::correlation::{CorrelationAnalysis, analyze_correlations};
use super::duplicates::{DuplicateKey, find_duplicate_groups};
use super::frequencies::categorical_frequencies;
use super::groups::grouped_statistics;
use super::models::{
    ColumnKind, ColumnProfile, DuplicateGroup, FrequencyEntry, GroupedStats, ProfileReport,
};
use super::outliers::{OutlierAnalysis, detect_outliers};

/// Analyzer producing a [`ProfileReport`] from a unified table.
///
/// The analyses share no state: each takes the table and configuration as
/// inputs and returns its own result. [`ProfileAnalyzer::analyze_concurrent`]
/// runs them as parallel blocking tasks over an `Arc`-shared table.
///
/// # Example
///
/// ```rust,ignore
/// use soilsurveyor_core::{ProfileAnalyzer, ProfileConfig};
///
/// let analyzer = ProfileAnalyzer::new(ProfileConfig::default());
/// let report = analyzer.analyze(&table)?;
/// println!("{} outliers", report.outliers.len());
/// ```
#[derive(Debug, Clone)]
pub struct ProfileAnalyzer {
    config: Arc<ProfileConfig>,
}

impl ProfileAnalyzer {
    /// Creates a new analyzer with the given configuration.
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new analyzer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ProfileConfig::default())
    }

    /// Returns a reference to the analyzer configuration.
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Validates configuration against the table and resolves column types.
    ///
    /// Fails with a configuration error before any analysis when a named
    /// column is missing, or the target or a grouped value column is not
    /// numeric.
    fn prepare(&self, table: &UnifiedTable) -> Result<Vec<ResolvedKind>> {
        self.config.validate()?;
        self.config.validate_against(table)?;

        let kinds = resolve_kinds(table, &self.config);

        if let Some(target) = &self.config.target_column {
            let is_numeric = table
                .column_position(target)
                .is_some_and(|pos| kinds[pos].kind == ColumnKind::Numeric);
            if !is_numeric {
                return Err(SurveyorError::configuration(format!(
                    "target_column '{}' is not numeric",
                    target
                )));
            }
        }

        for spec in &self.config.group_by {
            for column in &spec.values {
                let is_numeric = table
                    .column_position(column)
                    .is_some_and(|pos| kinds[pos].kind == ColumnKind::Numeric);
                if !is_numeric {
                    return Err(SurveyorError::configuration(format!(
                        "group_by value column '{}' is not numeric",
                        column
                    )));
                }
            }
        }

        Ok(kinds)
    }

    fn duplicate_keys(&self) -> Option<DuplicateKey> {
        if self.config.duplicate_key_columns.is_empty() {
            return None;
        }
        Some(DuplicateKey::Columns {
            columns: self.config.duplicate_key_columns.clone(),
            absent_matches_absent: self.config.absent_matches_absent,
        })
    }

    /// Analyzes the table sequentially.
    pub fn analyze(&self, table: &UnifiedTable) -> Result<ProfileReport> {
        let kinds = self.prepare(table)?;

        let columns = profile_columns(table, &kinds, &self.config);
        let full_row = find_duplicate_groups(table, &DuplicateKey::FullRow)?;
        let keyed = self
            .duplicate_keys()
            .map(|key| find_duplicate_groups(table, &key))
            .transpose()?;
        let outliers = detect_outliers(table, &numeric_positions(&kinds));
        let correlation = analyze_correlations(table, &kinds, &self.config);
        let breakdowns = breakdowns(table, &kinds, &self.config);

        Ok(assemble(
            columns,
            full_row,
            keyed,
            outliers,
            correlation,
            breakdowns,
        ))
    }

    /// Analyzes the table with each analysis on its own blocking task.
    ///
    /// Produces exactly the same report as [`ProfileAnalyzer::analyze`].
    pub async fn analyze_concurrent(&self, table: Arc<UnifiedTable>) -> Result<ProfileReport> {
        let kinds = Arc::new(self.prepare(&table)?);

        let columns_task = {
            let (table, kinds, config) = (table.clone(), kinds.clone(), self.config.clone());
            tokio::task::spawn_blocking(move || profile_columns(&table, &kinds, &config))
        };
        let duplicates_task = {
            let table = table.clone();
            let keys = self.duplicate_keys();
            tokio::task::spawn_blocking(move || -> Result<_> {
                let full_row = find_duplicate_groups(&table, &DuplicateKey::FullRow)?;
                let keyed = keys
                    .map(|key| find_duplicate_groups(&table, &key))
                    .transpose()?;
                Ok((full_row, keyed))
            })
        };
        let outliers_task = {
            let (table, kinds) = (table.clone(), kinds.clone());
            tokio::task::spawn_blocking(move || detect_outliers(&table, &numeric_positions(&kinds)))
        };
        let correlation_task = {
            let (table, kinds, config) = (table.clone(), kinds.clone(), self.config.clone());
            tokio::task::spawn_blocking(move || analyze_correlations(&table, &kinds, &config))
        };
        let breakdowns_task = {
            let (table, kinds, config) = (table.clone(), kinds.clone(), self.config.clone());
            tokio::task::spawn_blocking(move || breakdowns(&table, &kinds, &config))
        };

        let (columns, duplicates, outliers, correlation, breakdowns) = tokio::join!(
            columns_task,
            duplicates_task,
            outliers_task,
            correlation_task,
            breakdowns_task
        );

        let columns = columns.map_err(|e| SurveyorError::task("column profiling", e))?;
        let (full_row, keyed) =
            duplicates.map_err(|e| SurveyorError::task("duplicate detection", e))??;
        let outliers = outliers.map_err(|e| SurveyorError::task("outlier detection", e))?;
        let correlation =
            correlation.map_err(|e| SurveyorError::task("correlation analysis", e))?;
        let breakdowns =
            breakdowns.map_err(|e| SurveyorError::task("frequency and group summaries", e))?;

        Ok(assemble(
            columns,
            full_row,
            keyed,
            outliers,
            correlation,
            breakdowns,
        ))
    }
}

/// Categorical frequencies and configured group summaries.
fn breakdowns(
    table: &UnifiedTable,
    kinds: &[ResolvedKind],
    config: &ProfileConfig,
) -> (Vec<FrequencyEntry>, Vec<GroupedStats>) {
    (
        categorical_frequencies(table, kinds, config.frequency_top_n),
        grouped_statistics(table, &config.group_by),
    )
}

fn numeric_positions(kinds: &[ResolvedKind]) -> Vec<usize> {
    kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| k.kind == ColumnKind::Numeric)
        .map(|(idx, _)| idx)
        .collect()
}

fn assemble(
    columns: Vec<ColumnProfile>,
    full_row_duplicates: Vec<DuplicateGroup>,
    key_duplicates: Option<Vec<DuplicateGroup>>,
    outliers: OutlierAnalysis,
    correlation: CorrelationAnalysis,
    (frequencies, grouped): (Vec<FrequencyEntry>, Vec<GroupedStats>),
) -> ProfileReport {
    let mut warnings = outliers.warnings;
    warnings.extend(correlation.warnings);

    ProfileReport {
        columns,
        full_row_duplicates,
        key_duplicates,
        outliers: outliers.records,
        outlier_summaries: outliers.summaries,
        correlation: correlation.report,
        frequencies,
        grouped,
        warnings,
    }
}
