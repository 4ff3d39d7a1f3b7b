//! Union-of-columns concatenation.

use std::collections::HashMap;

use super::loader::LoadedSource;
use crate::models::{Cell, UnifiedTable};

/// Concatenates loaded sources into one [`UnifiedTable`].
///
/// The column set is the union across sources in first-seen order. Cells
/// for columns a source does not have are [`Cell::Absent`]. No column is
/// renamed or coalesced and no row is dropped.
pub fn build_unified_table(loaded: Vec<LoadedSource>) -> UnifiedTable {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for source in &loaded {
        for name in &source.table.columns {
            if !positions.contains_key(name) {
                positions.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
    }

    let total_rows: usize = loaded.iter().map(|s| s.table.row_count).sum();
    let mut rows = Vec::with_capacity(total_rows);
    let mut row_sources = Vec::with_capacity(total_rows);
    let mut sources = Vec::with_capacity(loaded.len());

    for (source_idx, source) in loaded.into_iter().enumerate() {
        let mapping: Vec<usize> = source
            .table
            .columns
            .iter()
            .filter_map(|name| positions.get(name).copied())
            .collect();

        for raw_row in source.rows {
            let mut row = vec![Cell::Absent; columns.len()];
            for (cell, &target) in raw_row.into_iter().zip(&mapping) {
                row[target] = cell;
            }
            rows.push(row);
            row_sources.push(source_idx);
        }

        sources.push(source.table);
    }

    tracing::info!(
        "Reconciled {} sources into {} rows x {} columns",
        sources.len(),
        rows.len(),
        columns.len()
    );

    UnifiedTable::from_parts(columns, rows, row_sources, sources)
}
