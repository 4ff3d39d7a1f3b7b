//! Statistical profiling of the unified table.
//!
//! This module provides the analyses run after reconciliation:
//! - **Duplicates**: exact full-row and key-subset groups, never removed
//! - **Missingness**: counts, completeness tiers and advisory pattern labels
//! - **Descriptive statistics**: type inference, numeric and categorical summaries
//! - **Outliers**: IQR fences per numeric column
//! - **Correlation**: pairwise Pearson matrix, strong pairs, target drivers
//! - **Frequencies**: most frequent values of each categorical column
//! - **Groups**: numeric summaries per value of a configured grouping column
//!
//! Everything is complete-case and descriptive. Missingness pattern labels
//! are configuration-driven heuristics, not statistical tests.

mod analyzer;
pub mod columns;
pub mod correlation;
pub mod duplicates;
pub mod frequencies;
pub mod groups;
pub mod missingness;
mod models;
pub mod outliers;
pub mod stats;

pub use analyzer::ProfileAnalyzer;
pub use duplicates::DuplicateKey;
pub use models::{
    AnalysisKind, BoundSide, CategoricalSummary, ColumnKind, ColumnProfile, CompletenessTier,
    CorrelationMatrix, CorrelationPair, CorrelationReport, CorrelationSign, CorrelationStrength,
    Diagnostics, DriverRanking, DuplicateGroup, FrequencyEntry, GroupedStats,
    InsufficientDataWarning, KeyMode, Missingness, MissingnessPattern, NumericSummary,
    OutlierRecord, OutlierSummary, PatternBasis, ProfileReport,
};
