//! Statistical profile models.
//!
//! This module defines the data structures produced by a profiling run.
//! Every value here is derived from a read-only [`crate::UnifiedTable`] and
//! never written back to it: duplicates, outliers and missingness labels
//! are annotations, not edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{LoadFailure, RowId, SchemaVersion};

/// Inferred or declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every present value parses as a finite number
    Numeric,
    /// Anything else
    Categorical,
}

impl ColumnKind {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

/// Completeness bucket assigned from a column's missing percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletenessTier {
    /// Below the first boundary (default <10% missing)
    Complete,
    /// Below the second boundary (default 10-30%)
    Usable,
    /// Below the third boundary (default 30-70%)
    Limited,
    /// Everything else (default >=70%)
    Excluded,
}

impl CompletenessTier {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletenessTier::Complete => "complete",
            CompletenessTier::Usable => "usable",
            CompletenessTier::Limited => "limited",
            CompletenessTier::Excluded => "excluded",
        }
    }
}

/// Advisory missingness label.
///
/// Heuristic metadata only. `MarLike`, `McarLike` and `MnarLike` come from
/// caller configuration and are never inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingnessPattern {
    /// No missing values
    Complete,
    /// Every value missing (the column never appears or is always empty)
    StructurallyAbsent,
    /// Configured: missingness follows another column
    MarLike,
    /// Configured: missingness unrelated to any column
    McarLike,
    /// Configured: missingness depends on the unobserved value itself
    MnarLike,
    /// Some values missing, no configured hint
    Unclassified,
}

impl MissingnessPattern {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingnessPattern::Complete => "complete",
            MissingnessPattern::StructurallyAbsent => "structurally_absent",
            MissingnessPattern::MarLike => "mar_like",
            MissingnessPattern::McarLike => "mcar_like",
            MissingnessPattern::MnarLike => "mnar_like",
            MissingnessPattern::Unclassified => "unclassified",
        }
    }
}

/// Where a missingness label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternBasis {
    /// Counted directly (complete / structurally absent / unclassified)
    Observed,
    /// Taken from a caller-supplied hint
    Configured,
}

impl PatternBasis {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternBasis::Observed => "observed",
            PatternBasis::Configured => "configured",
        }
    }
}

/// Missing-value accounting for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Missingness {
    /// Present values
    pub non_missing: usize,
    /// Absent or null values
    pub missing: usize,
    /// `missing / rows * 100`
    pub missing_pct: f64,
    /// Completeness bucket
    pub tier: CompletenessTier,
    /// Advisory label
    pub pattern: MissingnessPattern,
    /// Whether the label was observed or configured
    pub pattern_basis: PatternBasis,
    /// Sibling column named by a `mar_like` hint
    pub sibling: Option<String>,
}

/// Descriptive statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Number of parsed values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// 50th percentile
    pub median: f64,
    /// Sample standard deviation (n - 1); undefined below two values
    pub std: Option<f64>,
    /// 25th percentile (type 7 interpolation)
    pub q1: f64,
    /// 75th percentile (type 7 interpolation)
    pub q3: f64,
    /// `q3 - q1`
    pub iqr: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Coefficient of variation in percent; undefined for a zero mean
    pub cv_pct: Option<f64>,
}

/// Summary of a categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    /// Distinct present values
    pub distinct: usize,
    /// Most frequent value; ties go to the lexicographically smallest
    pub most_common: Option<String>,
    /// Occurrences of `most_common`
    pub most_common_count: usize,
}

/// Profile of one column of the unified table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name
    pub name: String,
    /// Inferred or declared type
    pub kind: ColumnKind,
    /// True when `kind` came from configuration
    pub kind_declared: bool,
    /// Missing-value accounting
    pub missingness: Missingness,
    /// Present values in a numeric column that failed to parse
    pub non_numeric: usize,
    /// Present for numeric columns with at least one parsed value
    pub numeric: Option<NumericSummary>,
    /// Present for categorical columns
    pub categorical: Option<CategoricalSummary>,
}

/// Which key a duplicate group was found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Every union column
    FullRow,
    /// Configured key-column subset
    Key,
}

impl KeyMode {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMode::FullRow => "full_row",
            KeyMode::Key => "key",
        }
    }
}

/// Rows sharing identical values across a key. Rows are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Key definition used
    pub mode: KeyMode,
    /// Shared key values; `None` marks a missing value
    pub key_values: Vec<Option<String>>,
    /// Member rows, ascending
    pub rows: Vec<RowId>,
}

impl DuplicateGroup {
    /// Number of member rows (always >= 2).
    pub fn size(&self) -> usize {
        self.rows.len()
    }
}

/// Which bound an outlier violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundSide {
    /// Below `Q1 - 1.5 * IQR`
    Lower,
    /// Above `Q3 + 1.5 * IQR`
    Upper,
}

impl BoundSide {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundSide::Lower => "lower",
            BoundSide::Upper => "upper",
        }
    }
}

/// One value strictly outside its column's IQR fences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    /// Row in the unified table
    pub row: RowId,
    /// Column the value belongs to
    pub column: String,
    /// Parsed value
    pub value: f64,
    /// Fence side that was crossed
    pub bound: BoundSide,
    /// The fence that was crossed
    pub bound_value: f64,
    /// Absolute distance beyond the fence
    pub distance: f64,
}

/// Per-column IQR fence summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    /// Column name
    pub column: String,
    /// Parsed values considered
    pub observations: usize,
    /// Values outside either fence
    pub outlier_count: usize,
    /// `outlier_count / observations * 100`
    pub outlier_pct: f64,
    /// Lower fence
    pub lower_bound: f64,
    /// Upper fence
    pub upper_bound: f64,
    /// 25th percentile
    pub q1: f64,
    /// 50th percentile
    pub median: f64,
    /// 75th percentile
    pub q3: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

/// Direction of a correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationSign {
    /// r > 0
    Positive,
    /// r < 0
    Negative,
    /// r == 0
    Zero,
}

impl CorrelationSign {
    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationSign::Positive => "positive",
            CorrelationSign::Negative => "negative",
            CorrelationSign::Zero => "zero",
        }
    }
}

/// Fixed strength bands for |r|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    /// [0, 0.1)
    Negligible,
    /// [0.1, 0.3)
    Weak,
    /// [0.3, 0.5)
    Moderate,
    /// [0.5, 0.7)
    Strong,
    /// [0.7, 0.9)
    VeryStrong,
    /// [0.9, 1.0]
    NearPerfect,
}

impl CorrelationStrength {
    /// Band for an absolute coefficient.
    pub fn from_abs(abs_r: f64) -> Self {
        match abs_r {
            a if a >= 0.9 => CorrelationStrength::NearPerfect,
            a if a >= 0.7 => CorrelationStrength::VeryStrong,
            a if a >= 0.5 => CorrelationStrength::Strong,
            a if a >= 0.3 => CorrelationStrength::Moderate,
            a if a >= 0.1 => CorrelationStrength::Weak,
            _ => CorrelationStrength::Negligible,
        }
    }

    /// Stable label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationStrength::Negligible => "negligible",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::VeryStrong => "very_strong",
            CorrelationStrength::NearPerfect => "near_perfect",
        }
    }
}

/// Pearson correlation of an unordered column pair (pairwise deletion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    /// Earlier column in matrix order (the target for driver rankings)
    pub column_a: String,
    /// Later column in matrix order
    pub column_b: String,
    /// `None` when fewer than two paired observations or zero variance
    pub r: Option<f64>,
    /// Rows where both columns held a number
    pub observations: usize,
}

impl CorrelationPair {
    /// |r|, if defined.
    pub fn abs_r(&self) -> Option<f64> {
        self.r.map(f64::abs)
    }

    /// Sign of r, if defined.
    pub fn sign(&self) -> Option<CorrelationSign> {
        self.r.map(|r| {
            if r > 0.0 {
                CorrelationSign::Positive
            } else if r < 0.0 {
                CorrelationSign::Negative
            } else {
                CorrelationSign::Zero
            }
        })
    }

    /// Strength band, if defined.
    pub fn strength(&self) -> Option<CorrelationStrength> {
        self.abs_r().map(CorrelationStrength::from_abs)
    }
}

/// Square symmetric correlation matrix over eligible numeric columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Row/column labels
    pub columns: Vec<String>,
    /// `values[i][j]` = r(columns[i], columns[j])
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Looks up r for two column names.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// One candidate column ranked against the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRanking {
    /// 1-based rank
    pub rank: usize,
    /// Correlation with the target; `column_a` is the target
    pub pair: CorrelationPair,
}

/// Everything the correlation engine produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// Square matrix over eligible columns
    pub matrix: CorrelationMatrix,
    /// Every upper-triangle pair in matrix order
    pub pairs: Vec<CorrelationPair>,
    /// Pairs with |r| above the threshold, strongest first
    pub strong: Vec<CorrelationPair>,
    /// Target ranking when a target column is configured
    pub drivers: Option<Vec<DriverRanking>>,
}

/// One of the most frequent values of a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    /// Column name
    pub column: String,
    /// Present cell text
    pub value: String,
    /// Occurrences of `value`
    pub count: usize,
    /// `count / non_missing * 100`
    pub pct: f64,
    /// 1-based; most frequent first, ties by ascending value
    pub rank: usize,
}

/// Numeric summary of one value column within one group.
///
/// Only complete cases count: the grouping cell is present and the value
/// cell parses as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedStats {
    /// Grouping column
    pub group_column: String,
    /// Grouping cell text shared by the group
    pub group_value: String,
    /// Summarized numeric column
    pub value_column: String,
    /// Complete cases in the group
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// 50th percentile
    pub median: f64,
    /// Sample standard deviation; undefined for a single case
    pub std: Option<f64>,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

/// Analysis a column was excluded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// IQR fences need at least four values
    Outliers,
    /// Correlation needs at least two values
    Correlation,
}

/// A column lacked enough values for one analysis. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientDataWarning {
    /// Column that was excluded
    pub column: String,
    /// Analysis it was excluded from
    pub analysis: AnalysisKind,
    /// Usable numeric values found
    pub available: usize,
    /// Minimum needed
    pub required: usize,
}

/// Complete output of the profile analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// One per union column, in table order
    pub columns: Vec<ColumnProfile>,
    /// Exact full-row groups
    pub full_row_duplicates: Vec<DuplicateGroup>,
    /// Key-subset groups when key columns are configured
    pub key_duplicates: Option<Vec<DuplicateGroup>>,
    /// Flagged values, by column then row
    pub outliers: Vec<OutlierRecord>,
    /// Fences for every numeric column with enough values
    pub outlier_summaries: Vec<OutlierSummary>,
    /// Matrix, pairs, strong pairs and drivers
    pub correlation: CorrelationReport,
    /// Most frequent values of each categorical column
    pub frequencies: Vec<FrequencyEntry>,
    /// Per-group numeric summaries for each configured grouping
    pub grouped: Vec<GroupedStats>,
    /// Outlier warnings first, then correlation warnings
    pub warnings: Vec<InsufficientDataWarning>,
}

/// Run-level diagnostics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// CSV files found under the input directory
    pub files_discovered: usize,
    /// Files that loaded into the combined table
    pub files_loaded: usize,
    /// Directories and files skipped, with reasons
    pub load_failures: Vec<LoadFailure>,
    /// Rows in the combined table
    pub rows: usize,
    /// Union columns, canonical columns included
    pub columns: usize,
    /// Loaded sources per schema version
    pub schema_versions: BTreeMap<SchemaVersion, usize>,
    /// Number of exact full-row groups
    pub full_row_duplicate_groups: usize,
    /// Number of key-subset groups when key columns are configured
    pub key_duplicate_groups: Option<usize>,
    /// Number of flagged outlier values
    pub outlier_records: usize,
    /// Columns in the correlation matrix
    pub correlated_columns: usize,
    /// Columns excluded from an analysis for lack of data
    pub insufficient_data: Vec<InsufficientDataWarning>,
}
