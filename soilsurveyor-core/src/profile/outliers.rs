//! IQR outlier detection.
//!
//! Values strictly outside [Q1 - 1.5 IQR, Q3 + 1.5 IQR] are annotated. The
//! table is never modified.

use crate::models::UnifiedTable;

use super::columns::numeric_values;
use super::models::{
    AnalysisKind, BoundSide, InsufficientDataWarning, OutlierRecord, OutlierSummary,
};
use super::stats::{Quartiles, sorted};

/// Fence multiplier applied to the IQR.
pub const IQR_FENCE: f64 = 1.5;

/// Minimum parsed values for meaningful quartiles.
pub const MIN_OUTLIER_VALUES: usize = 4;

/// Outlier detection output for all numeric columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutlierAnalysis {
    /// Records in column order, then row order
    pub records: Vec<OutlierRecord>,
    /// One summary per analyzed column
    pub summaries: Vec<OutlierSummary>,
    /// Columns skipped for too few values
    pub warnings: Vec<InsufficientDataWarning>,
}

/// Detects outliers in the given numeric columns.
///
/// # Arguments
/// * `table` - The unified table
/// * `columns` - Positions of numeric columns, in table order
pub fn detect_outliers(table: &UnifiedTable, columns: &[usize]) -> OutlierAnalysis {
    let mut analysis = OutlierAnalysis::default();

    for &column in columns {
        let name = &table.columns()[column];
        let (values, _) = numeric_values(table, column);

        if values.len() < MIN_OUTLIER_VALUES {
            tracing::warn!(
                "Skipping outlier detection for '{}': {} values, need {}",
                name,
                values.len(),
                MIN_OUTLIER_VALUES
            );
            analysis.warnings.push(InsufficientDataWarning {
                column: name.clone(),
                analysis: AnalysisKind::Outliers,
                available: values.len(),
                required: MIN_OUTLIER_VALUES,
            });
            continue;
        }

        let ordered = sorted(&values.iter().map(|(_, v)| *v).collect::<Vec<_>>());
        let Some(quartiles) = Quartiles::of_sorted(&ordered) else {
            continue;
        };
        let (lower, upper) = quartiles.fences(IQR_FENCE);

        let before = analysis.records.len();
        for &(row, value) in &values {
            let violation = if value < lower {
                Some((BoundSide::Lower, lower, lower - value))
            } else if value > upper {
                Some((BoundSide::Upper, upper, value - upper))
            } else {
                None
            };

            if let Some((bound, bound_value, distance)) = violation {
                analysis.records.push(OutlierRecord {
                    row,
                    column: name.clone(),
                    value,
                    bound,
                    bound_value,
                    distance,
                });
            }
        }
        let outlier_count = analysis.records.len() - before;

        analysis.summaries.push(OutlierSummary {
            column: name.clone(),
            observations: values.len(),
            outlier_count,
            outlier_pct: outlier_count as f64 / values.len() as f64 * 100.0,
            lower_bound: lower,
            upper_bound: upper,
            q1: quartiles.q1,
            median: quartiles.median,
            q3: quartiles.q3,
            min: ordered[0],
            max: ordered[ordered.len() - 1],
        });
    }

    tracing::info!(
        "Flagged {} outlier values across {} numeric columns",
        analysis.records.len(),
        analysis.summaries.len()
    );

    analysis
}
