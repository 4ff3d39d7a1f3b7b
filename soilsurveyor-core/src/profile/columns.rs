//! Column type inference and descriptive statistics.

use std::collections::BTreeMap;

use crate::config::ProfileConfig;
use crate::models::{RowId, UnifiedTable};

use super::missingness::analyze_missingness;
use super::models::{CategoricalSummary, ColumnKind, ColumnProfile, NumericSummary};
use super::stats::{Quartiles, mean, sample_std, sorted};

/// A column's type and whether configuration declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKind {
    /// Type used by every analysis
    pub kind: ColumnKind,
    /// True when `column_types` named the column
    pub declared: bool,
}

/// Infers a column type from its present values.
///
/// A column is numeric when it has at least one present value and every
/// present value parses as a finite number. A column with no present values
/// is categorical.
pub fn infer_kind(table: &UnifiedTable, column: usize) -> ColumnKind {
    let mut present = table.column_cells(column).filter(|c| !c.is_missing()).peekable();
    if present.peek().is_none() {
        return ColumnKind::Categorical;
    }
    if present.all(|c| c.as_f64().is_some()) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Resolves every column's type, declared types first.
pub fn resolve_kinds(table: &UnifiedTable, config: &ProfileConfig) -> Vec<ResolvedKind> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| match config.column_types.get(name) {
            Some(kind) => ResolvedKind {
                kind: *kind,
                declared: true,
            },
            None => ResolvedKind {
                kind: infer_kind(table, idx),
                declared: false,
            },
        })
        .collect()
}

/// Parsed numeric values of a column with their row ids, plus the number of
/// present values that did not parse.
pub fn numeric_values(table: &UnifiedTable, column: usize) -> (Vec<(RowId, f64)>, usize) {
    let mut values = Vec::new();
    let mut non_numeric = 0;
    for (row, cell) in table.column_cells(column).enumerate() {
        if cell.is_missing() {
            continue;
        }
        match cell.as_f64() {
            Some(v) => values.push((row, v)),
            None => non_numeric += 1,
        }
    }
    (values, non_numeric)
}

/// Descriptive statistics of a numeric sample. `None` when empty.
pub fn summarize_numeric(values: &[f64]) -> Option<NumericSummary> {
    let ordered = sorted(values);
    let quartiles = Quartiles::of_sorted(&ordered)?;
    let mean = mean(&ordered)?;
    let std = sample_std(&ordered);
    let cv_pct = match std {
        Some(s) if mean != 0.0 => Some(s / mean.abs() * 100.0),
        _ => None,
    };

    Some(NumericSummary {
        count: ordered.len(),
        mean,
        median: quartiles.median,
        std,
        q1: quartiles.q1,
        q3: quartiles.q3,
        iqr: quartiles.iqr(),
        min: ordered[0],
        max: ordered[ordered.len() - 1],
        cv_pct,
    })
}

/// Distinct count and most common value of a column's present values.
pub fn summarize_categorical(table: &UnifiedTable, column: usize) -> CategoricalSummary {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for text in table.column_cells(column).filter_map(|c| c.as_text()) {
        *counts.entry(text).or_insert(0) += 1;
    }

    // BTreeMap iterates ascending, so keeping the first maximum breaks ties
    // toward the smallest value
    let mut most_common: Option<(&str, usize)> = None;
    for (value, count) in &counts {
        if most_common.is_none_or(|(_, best)| *count > best) {
            most_common = Some((value, *count));
        }
    }

    CategoricalSummary {
        distinct: counts.len(),
        most_common: most_common.map(|(v, _)| v.to_string()),
        most_common_count: most_common.map_or(0, |(_, c)| c),
    }
}

/// Builds one [`ColumnProfile`] per union column, in table order.
pub fn profile_columns(
    table: &UnifiedTable,
    kinds: &[ResolvedKind],
    config: &ProfileConfig,
) -> Vec<ColumnProfile> {
    let profiles: Vec<ColumnProfile> = table
        .columns()
        .iter()
        .zip(kinds)
        .enumerate()
        .map(|(idx, (name, resolved))| {
            let missingness = analyze_missingness(
                table,
                idx,
                &config.completeness_tiers,
                config.missingness_hints.get(name),
            );

            let (numeric, non_numeric, categorical) = match resolved.kind {
                ColumnKind::Numeric => {
                    let (values, non_numeric) = numeric_values(table, idx);
                    let values: Vec<f64> = values.into_iter().map(|(_, v)| v).collect();
                    if non_numeric > 0 {
                        tracing::debug!(
                            "Column '{}' declared numeric has {} unparseable values",
                            name,
                            non_numeric
                        );
                    }
                    (summarize_numeric(&values), non_numeric, None)
                }
                ColumnKind::Categorical => (None, 0, Some(summarize_categorical(table, idx))),
            };

            ColumnProfile {
                name: name.clone(),
                kind: resolved.kind,
                kind_declared: resolved.declared,
                missingness,
                non_numeric,
                numeric,
                categorical,
            }
        })
        .collect();

    tracing::debug!("Profiled {} columns", profiles.len());
    profiles
}
