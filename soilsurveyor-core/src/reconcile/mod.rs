//! Schema reconciliation across drifted CSV exports.
//!
//! Discovers source files, loads each independently, tags it with a schema
//! version and concatenates everything into one [`crate::UnifiedTable`].

pub mod discovery;
pub mod loader;
pub mod mapping;
pub mod signature;
pub mod union;

pub use discovery::{Discovered, list_csv_files};
pub use loader::{LoadError, LoadOptions, LoadedSource, load_source, load_sources};
pub use mapping::{CanonicalMapping, validate_mappings, with_canonical_columns};
pub use signature::{SchemaSignature, default_signatures, detect_version};
pub use union::build_unified_table;
