//! Value frequencies of categorical columns.

use std::collections::BTreeMap;

use crate::models::UnifiedTable;

use super::columns::ResolvedKind;
use super::models::{ColumnKind, FrequencyEntry};

/// Most frequent present values of one column, at most `top_n` of them.
///
/// Ranked by count descending, ties by ascending value. Percentages are
/// relative to the column's present values, so missing cells never count.
pub fn top_values(table: &UnifiedTable, column: usize, top_n: usize) -> Vec<FrequencyEntry> {
    let Some(name) = table.columns().get(column) else {
        return Vec::new();
    };

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for text in table.column_cells(column).filter_map(|c| c.as_text()) {
        *counts.entry(text).or_insert(0) += 1;
    }
    let non_missing: usize = counts.values().sum();

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // Stable sort keeps the ascending value order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, (value, count))| FrequencyEntry {
            column: name.clone(),
            value: value.to_string(),
            count,
            pct: count as f64 / non_missing as f64 * 100.0,
            rank: idx + 1,
        })
        .collect()
}

/// Frequency tables for every categorical column, in table order.
pub fn categorical_frequencies(
    table: &UnifiedTable,
    kinds: &[ResolvedKind],
    top_n: usize,
) -> Vec<FrequencyEntry> {
    let entries: Vec<FrequencyEntry> = kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| k.kind == ColumnKind::Categorical)
        .flat_map(|(idx, _)| top_values(table, idx, top_n))
        .collect();

    tracing::debug!("Recorded {} categorical frequency entries", entries.len());
    entries
}
