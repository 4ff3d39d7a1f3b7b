//! Profiling run configuration.
//!
//! Every field is optional in the JSON configuration file and falls back to
//! the defaults below. Range checks run in [`ProfileConfig::validate`];
//! checks that need the union schema run in
//! [`ProfileConfig::validate_against`] after reconciliation and before any
//! analysis.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Result, SurveyorError};
use crate::models::UnifiedTable;
use crate::profile::{ColumnKind, CompletenessTier};
use crate::reconcile::{CanonicalMapping, SchemaSignature, default_signatures};

/// Caller-supplied missingness semantics for one column.
///
/// These hints are domain judgment, not statistics. They are copied onto
/// the column profile with a `configured` basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum MissingnessHint {
    /// Missing when a sibling test was not ordered
    MarLike {
        /// Sibling column whose absence explains this one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sibling: Option<String>,
    },
    /// Missing independently of everything else
    McarLike,
    /// Missing because of the value itself
    MnarLike,
}

/// One grouped-statistics request: a categorical grouping column and the
/// numeric columns summarized within each of its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupBySpec {
    /// Categorical column whose values form the groups
    pub column: String,
    /// Numeric columns summarized per group
    pub values: Vec<String>,
}

impl GroupBySpec {
    /// Creates a request grouping `values` by `column`.
    pub fn new<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Validation errors for profile configuration values.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("strong_correlation_threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f64),
    #[error("completeness_tiers must be strictly ascending within (0, 100], got {0:?}")]
    UnorderedTiers([f64; 4]),
    #[error("completeness_tiers must end at 100, got {0}")]
    OpenEndedTiers(f64),
    #[error("load_concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("duplicate_key_columns lists '{0}' more than once")]
    RepeatedKeyColumn(String),
    #[error("frequency_top_n must be at least 1")]
    ZeroFrequencyLimit,
    #[error("group_by entry for '{0}' lists no value columns")]
    EmptyGroupValues(String),
    #[error("group_by entry for '{0}' uses its grouping column as a value column")]
    SelfGroupedColumn(String),
}

impl From<ConfigValidationError> for SurveyorError {
    fn from(e: ConfigValidationError) -> Self {
        SurveyorError::configuration(e.to_string())
    }
}

/// Configuration for a profiling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// |r| strictly above this is "strong" (0.0-1.0)
    pub strong_correlation_threshold: f64,
    /// Ascending upper bounds (percent missing) for complete/usable/limited/excluded
    pub completeness_tiers: [f64; 4],
    /// Key subset for duplicate detection; empty means full-row only
    pub duplicate_key_columns: Vec<String>,
    /// Whether two missing key values are equal in key mode
    pub absent_matches_absent: bool,
    /// Column to rank drivers against
    pub target_column: Option<String>,
    /// Tiers included in correlation by default
    pub eligible_tiers_for_correlation: Vec<CompletenessTier>,
    /// Columns included in correlation regardless of tier
    pub correlation_opt_in: Vec<String>,
    /// Ordered schema signatures; first match wins
    pub signatures: Vec<SchemaSignature>,
    /// Derived canonical columns
    pub column_mappings: Vec<CanonicalMapping>,
    /// Advisory missingness labels per column
    pub missingness_hints: BTreeMap<String, MissingnessHint>,
    /// Declared column types overriding inference
    pub column_types: BTreeMap<String, ColumnKind>,
    /// Exact (trimmed) cell texts treated as null
    pub null_sentinels: Vec<String>,
    /// Maximum concurrent file loads
    pub load_concurrency: usize,
    /// Abort the run when more files than this fail to load
    pub max_load_failures: Option<usize>,
    /// Grouped numeric summaries by categorical column
    pub group_by: Vec<GroupBySpec>,
    /// Most frequent values reported per categorical column
    pub frequency_top_n: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            strong_correlation_threshold: 0.5,
            completeness_tiers: [10.0, 30.0, 70.0, 100.0],
            duplicate_key_columns: Vec::new(),
            absent_matches_absent: false,
            target_column: None,
            eligible_tiers_for_correlation: vec![
                CompletenessTier::Complete,
                CompletenessTier::Usable,
            ],
            correlation_opt_in: Vec::new(),
            signatures: default_signatures(),
            column_mappings: Vec::new(),
            missingness_hints: BTreeMap::new(),
            column_types: BTreeMap::new(),
            null_sentinels: [
                "#N/A", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            load_concurrency: 4,
            max_load_failures: None,
            group_by: Vec::new(),
            frequency_top_n: 10,
        }
    }
}

impl ProfileConfig {
    /// Creates a new profile config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| SurveyorError::io("read config", path, e))?;
        Self::from_json(&text)
    }

    /// Parses a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| SurveyorError::serialization("Failed to parse configuration", e))
    }

    /// Pretty JSON of the effective configuration.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SurveyorError::serialization("Failed to serialize configuration", e))
    }

    /// Builder method to set the strong-correlation threshold.
    pub fn with_strong_correlation_threshold(mut self, threshold: f64) -> Self {
        self.strong_correlation_threshold = threshold;
        self
    }

    /// Builder method to set the target column.
    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Builder method to set the duplicate key columns.
    pub fn with_duplicate_key_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.duplicate_key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set whether missing key values match.
    pub fn with_absent_matches_absent(mut self, enabled: bool) -> Self {
        self.absent_matches_absent = enabled;
        self
    }

    /// Builder method to set completeness tier boundaries.
    pub fn with_completeness_tiers(mut self, tiers: [f64; 4]) -> Self {
        self.completeness_tiers = tiers;
        self
    }

    /// Builder method to set the tiers eligible for correlation.
    pub fn with_eligible_tiers(mut self, tiers: Vec<CompletenessTier>) -> Self {
        self.eligible_tiers_for_correlation = tiers;
        self
    }

    /// Builder method to opt a column into correlation regardless of tier.
    pub fn with_correlation_opt_in(mut self, column: impl Into<String>) -> Self {
        self.correlation_opt_in.push(column.into());
        self
    }

    /// Builder method to add a canonical column mapping.
    pub fn with_column_mapping(mut self, mapping: CanonicalMapping) -> Self {
        self.column_mappings.push(mapping);
        self
    }

    /// Builder method to attach a missingness hint.
    pub fn with_missingness_hint(mut self, column: impl Into<String>, hint: MissingnessHint) -> Self {
        self.missingness_hints.insert(column.into(), hint);
        self
    }

    /// Builder method to declare a column type.
    pub fn with_column_type(mut self, column: impl Into<String>, kind: ColumnKind) -> Self {
        self.column_types.insert(column.into(), kind);
        self
    }

    /// Builder method to set the load concurrency.
    pub fn with_load_concurrency(mut self, concurrency: usize) -> Self {
        self.load_concurrency = concurrency;
        self
    }

    /// Builder method to set the load failure limit.
    pub fn with_max_load_failures(mut self, limit: usize) -> Self {
        self.max_load_failures = Some(limit);
        self
    }

    /// Builder method to add a grouped-statistics request.
    pub fn with_group_by(mut self, spec: GroupBySpec) -> Self {
        self.group_by.push(spec);
        self
    }

    /// Builder method to set how many values are kept per categorical column.
    pub fn with_frequency_top_n(mut self, limit: usize) -> Self {
        self.frequency_top_n = limit;
        self
    }

    /// Validates value ranges.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        let threshold = self.strong_correlation_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigValidationError::InvalidThreshold(threshold));
        }

        let tiers = self.completeness_tiers;
        let ascending = tiers.windows(2).all(|w| w[0] < w[1]);
        if !ascending || tiers[0] <= 0.0 || tiers.iter().any(|t| !t.is_finite()) {
            return Err(ConfigValidationError::UnorderedTiers(tiers));
        }
        if tiers[3] != 100.0 {
            return Err(ConfigValidationError::OpenEndedTiers(tiers[3]));
        }

        if self.load_concurrency == 0 {
            return Err(ConfigValidationError::ZeroConcurrency);
        }

        for (i, column) in self.duplicate_key_columns.iter().enumerate() {
            if self.duplicate_key_columns[..i].contains(column) {
                return Err(ConfigValidationError::RepeatedKeyColumn(column.clone()));
            }
        }

        if self.frequency_top_n == 0 {
            return Err(ConfigValidationError::ZeroFrequencyLimit);
        }

        for spec in &self.group_by {
            if spec.values.is_empty() {
                return Err(ConfigValidationError::EmptyGroupValues(spec.column.clone()));
            }
            if spec.values.contains(&spec.column) {
                return Err(ConfigValidationError::SelfGroupedColumn(spec.column.clone()));
            }
        }

        Ok(())
    }

    /// Checks every column the configuration names against the union schema.
    ///
    /// Column mappings are checked separately when they are applied, since
    /// hints and types may refer to the derived canonical columns.
    pub fn validate_against(&self, table: &UnifiedTable) -> Result<()> {
        let require = |setting: &str, column: &str| {
            if table.has_column(column) {
                Ok(())
            } else {
                Err(SurveyorError::unknown_column(setting, column))
            }
        };

        if let Some(target) = &self.target_column {
            require("target_column", target)?;
        }
        for column in &self.duplicate_key_columns {
            require("duplicate_key_columns", column)?;
        }
        for column in &self.correlation_opt_in {
            require("correlation_opt_in", column)?;
        }
        for (column, hint) in &self.missingness_hints {
            require("missingness_hints", column)?;
            if let MissingnessHint::MarLike {
                sibling: Some(sibling),
            } = hint
            {
                require("missingness_hints sibling", sibling)?;
            }
        }
        for column in self.column_types.keys() {
            require("column_types", column)?;
        }
        for spec in &self.group_by {
            require("group_by", &spec.column)?;
            for column in &spec.values {
                require("group_by values", column)?;
            }
        }

        Ok(())
    }
}
