//! Core data models for reconciled laboratory exports.
//!
//! A run loads many [`SourceTable`]s whose column sets drift between schema
//! generations and concatenates them into one [`UnifiedTable`]. Cells that
//! a source never had are kept as an explicit [`Cell::Absent`] marker so
//! that structural absence is never confused with a zero or an empty string.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema generation a source table was exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// First-generation column naming ("Soil pH 1:1", "Organic Matter, % LOI")
    V1,
    /// Second-generation column naming ("1:1 Soil pH", "Organic Matter")
    V2,
    /// No signature matched; rows are still included
    Unknown,
}

impl SchemaVersion {
    /// Stable lowercase label used in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V2 => "v2",
            SchemaVersion::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value in the unified table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    /// The column does not exist in this row's source schema.
    Absent,
    /// The column exists but holds an empty value or a null sentinel.
    /// The original text is retained so the combined table round-trips.
    Null(String),
    /// A present, trimmed value.
    Value(String),
}

impl Cell {
    /// Builds a cell from raw CSV text, classifying blanks and sentinels as null.
    pub fn from_raw(raw: &str, null_sentinels: &[String]) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || null_sentinels.iter().any(|s| s == trimmed) {
            Cell::Null(raw.to_string())
        } else {
            Cell::Value(trimmed.to_string())
        }
    }

    /// Absent and null cells are both missing for every analysis.
    pub fn is_missing(&self) -> bool {
        !matches!(self, Cell::Value(_))
    }

    /// Returns the value text for present cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Parses a present cell as a finite number.
    ///
    /// Text such as "NaN" or "inf" is rejected so it cannot poison
    /// statistical calculations.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_text()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Text written to the combined artifact. Absent cells render empty.
    pub fn output_text(&self) -> &str {
        match self {
            Cell::Absent => "",
            Cell::Null(raw) => raw,
            Cell::Value(v) => v,
        }
    }
}

/// Metadata for one successfully loaded source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    /// Path relative to the input root, with `/` separators
    pub source: String,
    /// Name of the directory the file was found in (export batch)
    pub batch: String,
    /// Header names in file order
    pub columns: Vec<String>,
    /// Number of data rows
    pub row_count: usize,
    /// Schema generation inferred from signature columns
    pub schema_version: SchemaVersion,
}

/// A source file that could not be loaded. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    /// Path relative to the input root
    pub source: String,
    /// Human readable reason
    pub reason: String,
}

/// Provenance columns leading every combined row. No source or canonical
/// column may use one of these names.
pub const RESERVED_COLUMNS: [&str; 4] = ["_row_id", "_source", "_batch", "_schema_version"];

/// Identifier of a row in the unified table (0-based position).
pub type RowId = usize;

/// Union-of-columns concatenation of all loaded source tables.
///
/// Row count always equals the sum of the source row counts. The table is
/// never mutated after construction; derived tables (see
/// [`crate::reconcile::CanonicalMapping`]) are new values.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedTable {
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
    row_sources: Vec<usize>,
    sources: Vec<SourceTable>,
}

impl UnifiedTable {
    /// Assembles a table from already-aligned parts.
    ///
    /// Every row must have exactly `columns.len()` cells and every entry of
    /// `row_sources` must index into `sources`.
    pub(crate) fn from_parts(
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
        row_sources: Vec<usize>,
        sources: Vec<SourceTable>,
    ) -> Self {
        debug_assert_eq!(rows.len(), row_sources.len());
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            columns,
            column_index,
            rows,
            row_sources,
            sources,
        }
    }

    /// Union column names in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, if it exists in the union schema.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    /// Returns true if the union schema contains `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All rows, each aligned with [`Self::columns`].
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// A single cell by row id and column position.
    pub fn cell(&self, row: RowId, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Iterates the cells of one column in row order.
    pub fn column_cells(&self, column: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[column])
    }

    /// Metadata of the loaded source tables, in load order.
    pub fn sources(&self) -> &[SourceTable] {
        &self.sources
    }

    /// Source table a row came from.
    pub fn source_of(&self, row: RowId) -> Option<&SourceTable> {
        self.row_sources
            .get(row)
            .and_then(|&idx| self.sources.get(idx))
    }

    /// Schema version of the source a row came from.
    pub fn version_of(&self, row: RowId) -> SchemaVersion {
        self.source_of(row)
            .map_or(SchemaVersion::Unknown, |s| s.schema_version)
    }

    /// Returns a copy of this table with extra columns appended.
    ///
    /// `extra` holds one cell vector per new column, each of length
    /// [`Self::row_count`].
    pub(crate) fn with_appended_columns(&self, names: Vec<String>, extra: Vec<Vec<Cell>>) -> Self {
        let mut columns = self.columns.clone();
        columns.extend(names);
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(row_id, row)| {
                let mut row = row.clone();
                row.extend(extra.iter().map(|col| col[row_id].clone()));
                row
            })
            .collect();
        Self::from_parts(columns, rows, self.row_sources.clone(), self.sources.clone())
    }
}
