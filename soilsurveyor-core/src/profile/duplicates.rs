//! Duplicate group detection.
//!
//! Groups rows sharing identical values across a key. Whether a repeat is
//! a re-test or a data-entry artifact is left to the reader: groups are
//! reported, rows are never removed or merged.

use std::collections::HashMap;

use crate::error::{Result, SurveyorError};
use crate::models::{RowId, UnifiedTable};

use super::models::{DuplicateGroup, KeyMode};

/// Key definition for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateKey {
    /// Every union column; missing equals missing
    FullRow,
    /// Named key columns
    Columns {
        columns: Vec<String>,
        /// Whether two missing key parts are equal
        absent_matches_absent: bool,
    },
}

/// Finds duplicate groups of size two or more.
///
/// Values compare by trimmed text. A missing value never equals a present
/// one. In column mode with `absent_matches_absent` false, a row with any
/// missing key part joins no group. Groups are ordered by their first row.
pub fn find_duplicate_groups(
    table: &UnifiedTable,
    key: &DuplicateKey,
) -> Result<Vec<DuplicateGroup>> {
    let (mode, positions, skip_missing) = match key {
        DuplicateKey::FullRow => (KeyMode::FullRow, (0..table.columns().len()).collect(), false),
        DuplicateKey::Columns {
            columns,
            absent_matches_absent,
        } => {
            let positions = columns
                .iter()
                .map(|name| {
                    table
                        .column_position(name)
                        .ok_or_else(|| SurveyorError::unknown_column("duplicate_key_columns", name))
                })
                .collect::<Result<Vec<usize>>>()?;
            (KeyMode::Key, positions, !absent_matches_absent)
        }
    };

    let mut group_index: HashMap<Vec<Option<&str>>, usize> = HashMap::new();
    let mut candidates: Vec<(Vec<Option<&str>>, Vec<RowId>)> = Vec::new();

    for (row_id, row) in table.rows().iter().enumerate() {
        let key_values: Vec<Option<&str>> =
            positions.iter().map(|&pos| row[pos].as_text()).collect();

        if skip_missing && key_values.iter().any(Option::is_none) {
            continue;
        }

        match group_index.get(&key_values) {
            Some(&idx) => candidates[idx].1.push(row_id),
            None => {
                group_index.insert(key_values.clone(), candidates.len());
                candidates.push((key_values, vec![row_id]));
            }
        }
    }

    let groups: Vec<DuplicateGroup> = candidates
        .into_iter()
        .filter(|(_, rows)| rows.len() >= 2)
        .map(|(key_values, rows)| DuplicateGroup {
            mode,
            key_values: key_values
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect(),
            rows,
        })
        .collect();

    let duplicate_rows: usize = groups.iter().map(DuplicateGroup::size).sum();
    tracing::info!(
        "Found {} {} duplicate groups covering {} rows",
        groups.len(),
        mode.as_str(),
        duplicate_rows
    );

    Ok(groups)
}
