//! Schema-version detection from signature column sets.

use serde::{Deserialize, Serialize};

use crate::models::SchemaVersion;

/// A set of column names that identifies one schema generation.
///
/// A table matches when its header contains every column of the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSignature {
    /// Version assigned on match
    pub version: SchemaVersion,
    /// Columns that must all be present
    pub columns: Vec<String>,
}

impl SchemaSignature {
    /// Creates a signature from column names.
    pub fn new<I, S>(version: SchemaVersion, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if every signature column is in `header`.
    ///
    /// An empty signature never matches; it would otherwise swallow every
    /// table including ones with no recognizable columns.
    pub fn matches(&self, header: &[String]) -> bool {
        !self.columns.is_empty() && self.columns.iter().all(|c| header.contains(c))
    }
}

/// Default signatures for the two observed export generations.
pub fn default_signatures() -> Vec<SchemaSignature> {
    vec![
        SchemaSignature::new(
            SchemaVersion::V1,
            ["Soil pH 1:1", "Organic Matter, % LOI"],
        ),
        SchemaSignature::new(SchemaVersion::V2, ["1:1 Soil pH", "Organic Matter"]),
    ]
}

/// Tags a header with the first matching signature's version.
pub fn detect_version(header: &[String], signatures: &[SchemaSignature]) -> SchemaVersion {
    signatures
        .iter()
        .find(|sig| sig.matches(header))
        .map_or(SchemaVersion::Unknown, |sig| sig.version)
}
