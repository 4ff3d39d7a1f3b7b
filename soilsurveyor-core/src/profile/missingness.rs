//! Missingness analysis.
//!
//! Absent cells (column not in the row's source schema) and null cells
//! (empty or sentinel values) count as missing identically; the profile does
//! not distinguish structural absence from empty values.

use crate::config::MissingnessHint;
use crate::models::UnifiedTable;

use super::models::{CompletenessTier, Missingness, MissingnessPattern, PatternBasis};

/// Counts missing values in one column and labels it.
///
/// # Arguments
/// * `table` - The unified table
/// * `column` - Column position
/// * `tiers` - Ascending tier upper bounds in percent
/// * `hint` - Configured missingness hint for this column, if any
pub fn analyze_missingness(
    table: &UnifiedTable,
    column: usize,
    tiers: &[f64; 4],
    hint: Option<&MissingnessHint>,
) -> Missingness {
    let total = table.row_count();
    let missing = table.column_cells(column).filter(|c| c.is_missing()).count();
    let non_missing = total - missing;

    // A table with no rows has nothing usable in any column
    let missing_pct = if total == 0 {
        100.0
    } else {
        missing as f64 / total as f64 * 100.0
    };

    let (pattern, pattern_basis, sibling) = classify_pattern(missing, total, hint);

    Missingness {
        non_missing,
        missing,
        missing_pct,
        tier: classify_tier(missing_pct, tiers),
        pattern,
        pattern_basis,
        sibling,
    }
}

/// Buckets a missing percentage: below `tiers[0]` is complete, below
/// `tiers[1]` usable, below `tiers[2]` limited, anything else excluded.
pub fn classify_tier(missing_pct: f64, tiers: &[f64; 4]) -> CompletenessTier {
    if missing_pct < tiers[0] {
        CompletenessTier::Complete
    } else if missing_pct < tiers[1] {
        CompletenessTier::Usable
    } else if missing_pct < tiers[2] {
        CompletenessTier::Limited
    } else {
        CompletenessTier::Excluded
    }
}

/// Assigns the advisory pattern label.
///
/// Observed facts win over hints: a column with no missing values is
/// `complete` and a fully missing column is `structurally_absent` whatever
/// the configuration says. Partial missingness takes the configured hint,
/// otherwise `unclassified`.
pub fn classify_pattern(
    missing: usize,
    total: usize,
    hint: Option<&MissingnessHint>,
) -> (MissingnessPattern, PatternBasis, Option<String>) {
    if missing == total {
        return (MissingnessPattern::StructurallyAbsent, PatternBasis::Observed, None);
    }
    if missing == 0 {
        return (MissingnessPattern::Complete, PatternBasis::Observed, None);
    }

    match hint {
        Some(MissingnessHint::MarLike { sibling }) => (
            MissingnessPattern::MarLike,
            PatternBasis::Configured,
            sibling.clone(),
        ),
        Some(MissingnessHint::McarLike) => {
            (MissingnessPattern::McarLike, PatternBasis::Configured, None)
        }
        Some(MissingnessHint::MnarLike) => {
            (MissingnessPattern::MnarLike, PatternBasis::Configured, None)
        }
        None => (MissingnessPattern::Unclassified, PatternBasis::Observed, None),
    }
}
