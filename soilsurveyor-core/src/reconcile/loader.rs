//! CSV source loading.
//!
//! Each file is parsed independently. A file that cannot be parsed becomes a
//! [`LoadFailure`] and is excluded from the run; it never aborts the other
//! loads. Loads are fanned out over blocking tasks with bounded concurrency
//! and re-ordered afterwards so the result does not depend on scheduling.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;

use super::discovery::{batch_label, source_id};
use super::signature::{SchemaSignature, detect_version};
use crate::models::{Cell, LoadFailure, RESERVED_COLUMNS, SourceTable};

/// Reasons a single source file is rejected.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read from disk
    #[error("unreadable file: {0}")]
    Read(#[from] std::io::Error),

    /// UTF-16 and other non UTF-8 exports are not supported
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(&'static str),

    /// Bytes are not valid UTF-8
    #[error("invalid UTF-8 after byte {valid_up_to}")]
    InvalidUtf8 { valid_up_to: usize },

    /// Header row missing or empty
    #[error("file has no columns")]
    NoColumns,

    /// A header cell is blank
    #[error("column {position} has an empty name")]
    EmptyColumnName { position: usize },

    /// The same header name appears twice
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A header name collides with a combined-table provenance column
    #[error("column name '{0}' is reserved")]
    ReservedColumn(String),

    /// A record has more fields than the header
    #[error("record on line {line} has {found} fields, header has {expected}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The CSV parser rejected a record
    #[error("unparseable record: {0}")]
    Record(#[from] csv::Error),
}

/// Options shared by every load in a run.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Trimmed values treated as null in addition to blanks
    pub null_sentinels: Vec<String>,
    /// Ordered schema signatures
    pub signatures: Vec<SchemaSignature>,
}

/// A parsed source: metadata plus rows in the file's own column order.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    /// Source metadata
    pub table: SourceTable,
    /// Cells aligned with `table.columns`
    pub rows: Vec<Vec<Cell>>,
}

/// Parses one CSV file.
pub fn load_source(
    path: &Path,
    root: &Path,
    options: &LoadOptions,
) -> std::result::Result<LoadedSource, LoadError> {
    let bytes = std::fs::read(path)?;
    let text = decode_utf8(&bytes)?;
    parse_source(
        text,
        source_id(root, path),
        batch_label(path),
        options,
    )
}

/// Strips a UTF-8 BOM and rejects UTF-16 or invalid bytes.
fn decode_utf8(bytes: &[u8]) -> std::result::Result<&str, LoadError> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Err(LoadError::UnsupportedEncoding("UTF-16 LE"));
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(LoadError::UnsupportedEncoding("UTF-16 BE"));
    }
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    std::str::from_utf8(body).map_err(|e| LoadError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

/// Parses CSV text into a [`LoadedSource`].
pub fn parse_source(
    text: &str,
    source: String,
    batch: String,
    options: &LoadOptions,
) -> std::result::Result<LoadedSource, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    validate_header(&columns)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() > columns.len() {
            return Err(LoadError::TooManyFields {
                line: record.position().map_or(0, csv::Position::line),
                expected: columns.len(),
                found: record.len(),
            });
        }

        // Short rows pad with empty (null) cells
        let row = (0..columns.len())
            .map(|idx| {
                record
                    .get(idx)
                    .map_or(Cell::Null(String::new()), |raw| {
                        Cell::from_raw(raw, &options.null_sentinels)
                    })
            })
            .collect();
        rows.push(row);
    }

    let schema_version = detect_version(&columns, &options.signatures);
    tracing::debug!(
        "Parsed '{}': {} columns, {} rows, schema {}",
        source,
        columns.len(),
        rows.len(),
        schema_version
    );

    Ok(LoadedSource {
        table: SourceTable {
            source,
            batch,
            row_count: rows.len(),
            columns,
            schema_version,
        },
        rows,
    })
}

fn validate_header(columns: &[String]) -> std::result::Result<(), LoadError> {
    if columns.is_empty() {
        return Err(LoadError::NoColumns);
    }
    for (position, name) in columns.iter().enumerate() {
        if name.is_empty() {
            return Err(LoadError::EmptyColumnName {
                position: position + 1,
            });
        }
        if columns[..position].contains(name) {
            return Err(LoadError::DuplicateColumn(name.clone()));
        }
        if RESERVED_COLUMNS.contains(&name.as_str()) {
            return Err(LoadError::ReservedColumn(name.clone()));
        }
    }
    Ok(())
}

/// Loads many files concurrently.
///
/// Uses `futures::stream::buffer_unordered` for controlled parallelism;
/// each parse runs on the blocking pool. Successes and failures are
/// returned in the order of `paths`.
pub async fn load_sources(
    paths: &[PathBuf],
    root: &Path,
    options: Arc<LoadOptions>,
    max_concurrency: usize,
) -> (Vec<LoadedSource>, Vec<LoadFailure>) {
    let load_futures = paths.iter().enumerate().map(|(index, path)| {
        let path = path.clone();
        let root = root.to_path_buf();
        let options = Arc::clone(&options);
        async move {
            let id = source_id(&root, &path);
            let outcome =
                tokio::task::spawn_blocking(move || load_source(&path, &root, &options)).await;
            let outcome = match outcome {
                Ok(Ok(loaded)) => Ok(loaded),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("loader task failed: {}", e)),
            };
            (index, id, outcome)
        }
    });

    let mut outcomes: Vec<_> = stream::iter(load_futures)
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut loaded = Vec::new();
    let mut failures = Vec::new();
    for (_, id, outcome) in outcomes {
        match outcome {
            Ok(source) => loaded.push(source),
            Err(reason) => {
                tracing::warn!("Failed to load '{}': {}", id, reason);
                failures.push(LoadFailure { source: id, reason });
            }
        }
    }

    tracing::info!(
        "Loaded {} of {} source files ({} failed)",
        loaded.len(),
        paths.len(),
        failures.len()
    );

    (loaded, failures)
}
