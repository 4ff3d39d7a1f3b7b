//! Core engine for SoilSurveyor.
//!
//! This crate turns a directory of independently generated soil-test CSV
//! exports into one reconciled table and a reproducible statistical
//! profile. It is shared by the `soilsurveyor` binary and by tests.
//!
//! # Guarantees
//! - No row is dropped, merged or deduplicated during reconciliation
//! - Columns missing from a source are an explicit absent marker, never zero
//!   or an empty string
//! - A file that fails to load is recorded and skipped, never fatal
//! - Artifacts are a pure function of the input files and configuration
//!
//! # Architecture
//! - [`reconcile`]: discovery, per-file loading, schema tagging and union
//! - [`profile`]: duplicates, missingness, descriptive statistics, outliers,
//!   correlation, value frequencies and grouped summaries over the read-only
//!   table
//! - [`emit`]: CSV and JSON artifact output
//! - [`pipeline`]: the end-to-end run

pub mod config;
pub mod emit;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod reconcile;

// Re-export commonly used types
pub use config::{ConfigValidationError, GroupBySpec, MissingnessHint, ProfileConfig};
pub use emit::ProfileEmitter;
pub use error::{Result, SurveyorError};
pub use logging::init_logging;
pub use models::{Cell, LoadFailure, RowId, SchemaVersion, SourceTable, UnifiedTable};
pub use pipeline::{Reconciled, RunSummary, reconcile_sources, run};
pub use profile::{
    ColumnKind, ColumnProfile, CompletenessTier, CorrelationPair, Diagnostics, DuplicateGroup,
    FrequencyEntry, GroupedStats, InsufficientDataWarning, OutlierRecord, ProfileAnalyzer,
    ProfileReport,
};
pub use reconcile::{CanonicalMapping, SchemaSignature};
