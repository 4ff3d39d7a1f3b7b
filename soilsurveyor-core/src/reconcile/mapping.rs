//! Caller-supplied canonical column mappings.
//!
//! Columns that measure the same thing under different names in different
//! schema generations are never coalesced automatically. A mapping names the
//! source column to use for each version; applying it derives a new column.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyorError};
use crate::models::{Cell, RESERVED_COLUMNS, SchemaVersion, UnifiedTable};

/// One derived column: `canonical` takes, per row, the cell of the source
/// column mapped for that row's schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMapping {
    /// Name of the derived column
    pub canonical: String,
    /// Source column per schema version
    pub sources: BTreeMap<SchemaVersion, String>,
}

impl CanonicalMapping {
    /// Creates an empty mapping for `canonical`.
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            sources: BTreeMap::new(),
        }
    }

    /// Adds the source column for one schema version.
    pub fn with_source(mut self, version: SchemaVersion, column: impl Into<String>) -> Self {
        self.sources.insert(version, column.into());
        self
    }
}

/// Validates mappings against the table's union schema.
pub fn validate_mappings(table: &UnifiedTable, mappings: &[CanonicalMapping]) -> Result<()> {
    let mut seen: Vec<&str> = Vec::new();
    for mapping in mappings {
        if table.has_column(&mapping.canonical) || seen.contains(&mapping.canonical.as_str()) {
            return Err(SurveyorError::configuration(format!(
                "column_mappings canonical name '{}' collides with an existing column",
                mapping.canonical
            )));
        }
        if RESERVED_COLUMNS.contains(&mapping.canonical.as_str()) {
            return Err(SurveyorError::configuration(format!(
                "column_mappings canonical name '{}' is reserved",
                mapping.canonical
            )));
        }
        seen.push(&mapping.canonical);

        for column in mapping.sources.values() {
            if !table.has_column(column) {
                return Err(SurveyorError::unknown_column("column_mappings", column));
            }
        }
    }
    Ok(())
}

/// Returns a new table with one appended column per mapping.
///
/// Rows whose version has no mapped source column get [`Cell::Absent`].
pub fn with_canonical_columns(
    table: &UnifiedTable,
    mappings: &[CanonicalMapping],
) -> Result<UnifiedTable> {
    validate_mappings(table, mappings)?;
    if mappings.is_empty() {
        return Ok(table.clone());
    }

    let mut names = Vec::with_capacity(mappings.len());
    let mut extra = Vec::with_capacity(mappings.len());

    for mapping in mappings {
        let positions: BTreeMap<SchemaVersion, usize> = mapping
            .sources
            .iter()
            .filter_map(|(version, column)| {
                table.column_position(column).map(|pos| (*version, pos))
            })
            .collect();

        let cells = (0..table.row_count())
            .map(|row| {
                positions
                    .get(&table.version_of(row))
                    .and_then(|&pos| table.cell(row, pos))
                    .cloned()
                    .unwrap_or(Cell::Absent)
            })
            .collect();

        tracing::debug!(
            "Derived canonical column '{}' from {} source columns",
            mapping.canonical,
            positions.len()
        );
        names.push(mapping.canonical.clone());
        extra.push(cells);
    }

    Ok(table.with_appended_columns(names, extra))
}
