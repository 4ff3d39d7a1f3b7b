//! Numeric summaries split by a categorical column.

use std::collections::BTreeMap;

use crate::config::GroupBySpec;
use crate::models::UnifiedTable;

use super::columns::summarize_numeric;
use super::models::GroupedStats;

/// Summarizes one value column within each group of `group_column`.
///
/// Rows with a missing group cell or a missing or non-numeric value are
/// skipped. Groups come out by mean descending, ties by ascending group
/// value.
pub fn group_summaries(
    table: &UnifiedTable,
    group_column: usize,
    value_column: usize,
) -> Vec<GroupedStats> {
    let (Some(group_name), Some(value_name)) = (
        table.columns().get(group_column),
        table.columns().get(value_column),
    ) else {
        return Vec::new();
    };

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in table.rows() {
        let group = row.get(group_column).and_then(|c| c.as_text());
        let value = row.get(value_column).and_then(|c| c.as_f64());
        if let (Some(group), Some(value)) = (group, value) {
            groups.entry(group).or_default().push(value);
        }
    }

    let mut stats: Vec<GroupedStats> = groups
        .into_iter()
        .filter_map(|(group, values)| {
            let summary = summarize_numeric(&values)?;
            Some(GroupedStats {
                group_column: group_name.clone(),
                group_value: group.to_string(),
                value_column: value_name.clone(),
                count: summary.count,
                mean: summary.mean,
                median: summary.median,
                std: summary.std,
                min: summary.min,
                max: summary.max,
            })
        })
        .collect();
    // Stable sort keeps ascending group order among equal means
    stats.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    stats
}

/// Runs every configured grouping, in configuration order.
pub fn grouped_statistics(table: &UnifiedTable, specs: &[GroupBySpec]) -> Vec<GroupedStats> {
    let mut out = Vec::new();
    for spec in specs {
        let Some(group_column) = table.column_position(&spec.column) else {
            continue;
        };
        for value in &spec.values {
            if let Some(value_column) = table.column_position(value) {
                out.extend(group_summaries(table, group_column, value_column));
            }
        }
    }

    tracing::debug!(
        "Computed {} grouped summaries for {} groupings",
        out.len(),
        specs.len()
    );
    out
}
