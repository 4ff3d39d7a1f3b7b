//! Error types for SoilSurveyor runs.
//!
//! Only conditions the caller controls and can fix immediately are errors:
//! bad configuration, an input directory that does not exist, an output
//! directory that cannot be written. Per-file load failures and per-column
//! insufficient-data conditions are recorded in [`crate::Diagnostics`]
//! instead and never abort a run.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for SoilSurveyor operations.
#[derive(Debug, Error)]
pub enum SurveyorError {
    /// Configuration does not match the inputs (fatal, raised before analysis)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// More source files failed to load than the configured limit allows
    #[error("Too many load failures: {failed} files failed (limit {limit})")]
    TooManyLoadFailures { failed: usize, limit: usize },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV reading or writing failed
    #[error("CSV operation failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A background analysis or load task panicked or was cancelled
    #[error("Background task failed: {context}")]
    Task {
        context: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Convenience type alias for Results with SurveyorError
pub type Result<T> = std::result::Result<T, SurveyorError>;

impl SurveyorError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a configuration error for a column name missing from the union schema.
    pub fn unknown_column(setting: &str, column: &str) -> Self {
        Self::configuration(format!(
            "{} references column '{}' which is not present in any loaded source",
            setting, column
        ))
    }

    /// Creates an I/O error with the offending path in its context
    pub fn io(action: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context: format!("Failed to {} {}", action, path.into().display()),
            source,
        }
    }

    /// Creates a CSV error with context
    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Creates a task join error with context
    pub fn task(context: impl Into<String>, source: tokio::task::JoinError) -> Self {
        Self::Task {
            context: context.into(),
            source,
        }
    }

    /// Returns true for errors raised by configuration validation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
