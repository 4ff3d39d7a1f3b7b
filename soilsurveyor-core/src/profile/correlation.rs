//! Pairwise Pearson correlation.
//!
//! Each pair uses every row where both columns hold a number (pairwise
//! deletion), so different pairs may be computed from different row
//! subsets. The observation count is kept on every pair for that reason.
//! No p-values or confidence intervals are produced.

use std::cmp::Ordering;

use crate::config::ProfileConfig;
use crate::models::UnifiedTable;

use super::columns::ResolvedKind;
use super::missingness::analyze_missingness;
use super::models::{
    AnalysisKind, ColumnKind, CorrelationMatrix, CorrelationPair, CorrelationReport,
    DriverRanking, InsufficientDataWarning,
};
use super::stats::pearson;

/// Minimum numeric values for a column to enter the matrix.
pub const MIN_CORRELATION_VALUES: usize = 2;

/// Correlation output plus the columns left out for lack of data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationAnalysis {
    /// Matrix, pairs, strong pairs and drivers
    pub report: CorrelationReport,
    /// Numeric columns left out of the matrix for too few values
    pub warnings: Vec<InsufficientDataWarning>,
}

/// A column's parsed values aligned by row id.
struct NumericColumn<'a> {
    name: &'a str,
    values: Vec<Option<f64>>,
}

impl<'a> NumericColumn<'a> {
    fn load(table: &'a UnifiedTable, column: usize) -> Self {
        Self {
            name: &table.columns()[column],
            values: table.column_cells(column).map(|c| c.as_f64()).collect(),
        }
    }

    fn count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Pearson r of two aligned columns over rows where both are present.
fn correlate(a: &NumericColumn<'_>, b: &NumericColumn<'_>) -> CorrelationPair {
    let paired: Vec<(f64, f64)> = a
        .values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    CorrelationPair {
        column_a: a.name.to_string(),
        column_b: b.name.to_string(),
        r: pearson(&paired),
        observations: paired.len(),
    }
}

/// Positions of numeric columns eligible for correlation, in table order.
///
/// A numeric column is eligible when its completeness tier is listed in
/// `eligible_tiers_for_correlation`, when it is opted in explicitly, or when
/// it is the target column.
pub fn select_eligible(
    table: &UnifiedTable,
    kinds: &[ResolvedKind],
    config: &ProfileConfig,
) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            let opted_in = config.correlation_opt_in.contains(*name)
                || config.target_column.as_ref() == Some(*name);
            if kinds[*idx].kind != ColumnKind::Numeric {
                if opted_in {
                    tracing::warn!("Column '{}' is not numeric; excluded from correlation", name);
                }
                return false;
            }
            opted_in || {
                let tier = analyze_missingness(table, *idx, &config.completeness_tiers, None).tier;
                config.eligible_tiers_for_correlation.contains(&tier)
            }
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Orders by |r| descending, then by the given names; undefined r last.
fn compare_strength(a: &CorrelationPair, b: &CorrelationPair) -> Ordering {
    match (a.abs_r(), b.abs_r()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.column_a.cmp(&b.column_a))
    .then_with(|| a.column_b.cmp(&b.column_b))
}

/// Pairs with |r| strictly above `threshold`, strongest first.
pub fn strong_pairs(pairs: &[CorrelationPair], threshold: f64) -> Vec<CorrelationPair> {
    let mut strong: Vec<CorrelationPair> = pairs
        .iter()
        .filter(|p| p.abs_r().is_some_and(|abs| abs > threshold))
        .cloned()
        .collect();
    strong.sort_by(compare_strength);
    strong
}

/// Builds the matrix, pair list, strong extract and driver ranking.
pub fn analyze_correlations(
    table: &UnifiedTable,
    kinds: &[ResolvedKind],
    config: &ProfileConfig,
) -> CorrelationAnalysis {
    let mut warnings = Vec::new();
    let mut included: Vec<NumericColumn<'_>> = Vec::new();

    for idx in select_eligible(table, kinds, config) {
        let column = NumericColumn::load(table, idx);
        let available = column.count();
        if available < MIN_CORRELATION_VALUES {
            tracing::warn!(
                "Excluding '{}' from correlation: {} values, need {}",
                column.name,
                available,
                MIN_CORRELATION_VALUES
            );
            warnings.push(InsufficientDataWarning {
                column: column.name.to_string(),
                analysis: AnalysisKind::Correlation,
                available,
                required: MIN_CORRELATION_VALUES,
            });
            continue;
        }
        included.push(column);
    }

    let n = included.len();
    let mut values = vec![vec![None; n]; n];
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let pair = correlate(&included[i], &included[j]);
            values[i][j] = pair.r;
            values[j][i] = pair.r;
            pairs.push(pair);
        }
    }

    let strong = strong_pairs(&pairs, config.strong_correlation_threshold);

    let drivers = config.target_column.as_deref().map(|target| {
        let target_column = match table.column_position(target) {
            Some(pos) => NumericColumn::load(table, pos),
            None => NumericColumn {
                name: target,
                values: Vec::new(),
            },
        };
        let mut ranked: Vec<CorrelationPair> = included
            .iter()
            .filter(|c| c.name != target)
            .map(|c| correlate(&target_column, c))
            .collect();
        ranked.sort_by(compare_strength);
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, pair)| DriverRanking { rank: i + 1, pair })
            .collect::<Vec<_>>()
    });

    tracing::info!(
        "Correlated {} columns: {} pairs, {} strong (|r| > {})",
        n,
        pairs.len(),
        strong.len(),
        config.strong_correlation_threshold
    );

    CorrelationAnalysis {
        report: CorrelationReport {
            matrix: CorrelationMatrix {
                columns: included.iter().map(|c| c.name.to_string()).collect(),
                values,
            },
            pairs,
            strong,
            drivers,
        },
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, SchemaVersion, SourceTable};
    use crate::profile::columns::resolve_kinds;
    use crate::profile::models::{CorrelationSign, CorrelationStrength};

    fn cell(v: Option<f64>) -> Cell {
        v.map_or(Cell::Absent, |v| Cell::Value(v.to_string()))
    }

    fn table(columns: &[(&str, Vec<Option<f64>>)]) -> UnifiedTable {
        let names: Vec<String> = columns.iter().map(|(n, _)| (*n).to_string()).collect();
        let rows = columns.first().map_or(0, |(_, v)| v.len());
        UnifiedTable::from_parts(
            names.clone(),
            (0..rows)
                .map(|r| columns.iter().map(|(_, v)| cell(v[r])).collect())
                .collect(),
            vec![0; rows],
            vec![SourceTable {
                source: "a.csv".to_string(),
                batch: String::new(),
                columns: names,
                row_count: rows,
                schema_version: SchemaVersion::Unknown,
            }],
        )
    }

    fn run(t: &UnifiedTable, config: &ProfileConfig) -> CorrelationAnalysis {
        analyze_correlations(t, &resolve_kinds(t, config), config)
    }

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_perfect_correlation() {
        let t = table(&[
            ("X", some(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("Y", some(&[2.0, 4.0, 6.0, 8.0, 10.0])),
        ]);
        let analysis = run(&t, &ProfileConfig::default());
        let pair = &analysis.report.pairs[0];

        assert_eq!(pair.r, Some(1.0));
        assert_eq!(pair.sign(), Some(CorrelationSign::Positive));
        assert_eq!(pair.strength(), Some(CorrelationStrength::NearPerfect));
        assert_eq!(pair.observations, 5);
        assert_eq!(analysis.report.strong.len(), 1);
        assert_eq!(analysis.report.matrix.get("Y", "X"), Some(1.0));
        assert_eq!(analysis.report.matrix.get("X", "X"), Some(1.0));
    }

    #[test]
    fn test_pairwise_deletion_and_undefined_r() {
        let t = table(&[
            ("A", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
            ("B", vec![Some(2.0), None, Some(3.0), Some(8.0)]),
            ("C", some(&[5.0, 5.0, 5.0, 5.0])),
        ]);
        let analysis = run(&t, &ProfileConfig::new().with_eligible_tiers(vec![
            crate::profile::CompletenessTier::Complete,
            crate::profile::CompletenessTier::Usable,
            crate::profile::CompletenessTier::Limited,
        ]));

        let ab = &analysis.report.pairs[0];
        assert_eq!((ab.column_a.as_str(), ab.column_b.as_str()), ("A", "B"));
        assert_eq!(ab.observations, 2);
        assert_eq!(ab.r, Some(1.0));

        // Constant column: r undefined, never coerced to zero
        let ac = &analysis.report.pairs[1];
        assert_eq!(ac.r, None);
        assert_eq!(analysis.report.matrix.get("C", "C"), Some(1.0));
    }

    #[test]
    fn test_tier_gating_and_opt_in() {
        // B is 75% missing: excluded tier
        let b = vec![Some(1.0), None, None, None];
        let t = table(&[("A", some(&[1.0, 2.0, 3.0, 4.0])), ("B", b)]);

        let default = run(&t, &ProfileConfig::default());
        assert_eq!(default.report.matrix.columns, vec!["A"]);
        assert!(default.report.pairs.is_empty());

        // Opted in but only one value: insufficient data warning
        let opted = run(&t, &ProfileConfig::new().with_correlation_opt_in("B"));
        assert_eq!(opted.report.matrix.columns, vec!["A"]);
        assert_eq!(opted.warnings.len(), 1);
        assert_eq!(opted.warnings[0].column, "B");
        assert_eq!(opted.warnings[0].analysis, AnalysisKind::Correlation);
    }

    #[test]
    fn test_driver_ranking_order() {
        let t = table(&[
            ("Score", some(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("Weak", some(&[2.0, 1.0, 4.0, 3.0, 2.0])),
            ("Inverse", some(&[10.0, 8.0, 6.0, 4.0, 2.0])),
            ("Flat", some(&[3.0, 3.0, 3.0, 3.0, 3.0])),
            ("Also", some(&[1.0, 2.0, 3.0, 4.0, 5.0])),
        ]);
        let analysis = run(&t, &ProfileConfig::new().with_target_column("Score"));
        let drivers = analysis.report.drivers.unwrap();
        let order: Vec<&str> = drivers.iter().map(|d| d.pair.column_b.as_str()).collect();

        // Ties on |r| = 1 break by name; undefined r goes last
        assert_eq!(order, vec!["Also", "Inverse", "Weak", "Flat"]);
        assert_eq!(drivers[0].rank, 1);
        assert_eq!(drivers[1].pair.sign(), Some(CorrelationSign::Negative));
        assert!(drivers.iter().all(|d| d.pair.column_a == "Score"));
        assert_eq!(drivers[3].pair.r, None);
    }

    #[test]
    fn test_strong_pairs_sorted() {
        let pair = |a: &str, b: &str, r: f64| CorrelationPair {
            column_a: a.to_string(),
            column_b: b.to_string(),
            r: Some(r),
            observations: 10,
        };
        let pairs = vec![
            pair("A", "B", 0.55),
            pair("A", "C", -0.8),
            pair("B", "C", 0.5),
            pair("C", "D", 0.8),
        ];
        let strong = strong_pairs(&pairs, 0.5);
        let names: Vec<(&str, &str)> = strong
            .iter()
            .map(|p| (p.column_a.as_str(), p.column_b.as_str()))
            .collect();
        assert_eq!(names, vec![("A", "C"), ("C", "D"), ("A", "B")]);
    }

    #[test]
    fn test_matrix_symmetric() {
        let t = table(&[
            ("P", some(&[1.0, 4.0, 2.0, 8.0, 5.0])),
            ("K", some(&[3.0, 1.0, 4.0, 1.0, 5.0])),
            ("OM", some(&[2.0, 7.0, 1.0, 8.0, 2.0])),
        ]);
        let matrix = run(&t, &ProfileConfig::default()).report.matrix;
        for a in &matrix.columns {
            for b in &matrix.columns {
                assert_eq!(matrix.get(a, b), matrix.get(b, a));
            }
        }
    }
}
