//! Score aggregation and the single reconciliation authority.
//!
//! The ordered answer list is the source of truth; category counts are a
//! derived cache. Every caller that needs counts goes through this module,
//! so there is exactly one tally implementation in the codebase.

use crate::category::{CATEGORY_COUNT, Category, CategoryCounts};
use tracing::warn;

/// Rebuilds category counts from an ordered answer list.
pub fn tally(answers: &[Category]) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for answer in answers {
        counts.increment(*answer);
    }
    counts
}

/// Restores the `sum(counts) == len(answers)` invariant.
///
/// When the supplied counts disagree with the answer list they are
/// discarded and rebuilt from scratch; the repair is logged and never
/// surfaced to the respondent. Consistent counts pass through unchanged,
/// which makes reconciliation idempotent.
pub fn reconcile(answers: &[Category], counts: CategoryCounts) -> CategoryCounts {
    if counts.total() as usize == answers.len() {
        return counts;
    }
    warn!(
        recorded = counts.total(),
        expected = answers.len(),
        "category counts drifted from answer list, rebuilding"
    );
    tally(answers)
}

/// Integer percentage per category, in label order.
///
/// Every category is 0 when the total is 0; there is no division-by-zero
/// fault for an empty tally.
pub fn percentages(counts: &CategoryCounts) -> [u8; CATEGORY_COUNT] {
    let total = counts.total();
    let mut result = [0u8; CATEGORY_COUNT];
    if total == 0 {
        return result;
    }
    for (category, count) in counts.iter() {
        result[category.index()] = ((count as f64 / total as f64) * 100.0).round() as u8;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_each_occurrence() {
        let answers = vec![
            Category::One,
            Category::Two,
            Category::Two,
            Category::Four,
        ];
        let counts = tally(&answers);
        assert_eq!(counts.get(Category::One), 1);
        assert_eq!(counts.get(Category::Two), 2);
        assert_eq!(counts.get(Category::Three), 0);
        assert_eq!(counts.get(Category::Four), 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_reconcile_keeps_consistent_counts() {
        let answers = vec![Category::Three, Category::Three];
        let counts = tally(&answers);
        assert_eq!(reconcile(&answers, counts), counts);
    }

    #[test]
    fn test_reconcile_rebuilds_drifted_counts() {
        let answers = vec![Category::One, Category::Three];
        // A drifted cache claiming five answers for category 2.
        let drifted = CategoryCounts::from_array([0, 5, 0, 0]);
        let repaired = reconcile(&answers, drifted);
        assert_eq!(repaired, tally(&answers));
        assert_eq!(repaired.total(), 2);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let answers = vec![Category::Two, Category::Four, Category::Two];
        let drifted = CategoryCounts::from_array([9, 0, 0, 0]);
        let once = reconcile(&answers, drifted);
        let twice = reconcile(&answers, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_percentages_zero_total() {
        let counts = CategoryCounts::new();
        assert_eq!(percentages(&counts), [0, 0, 0, 0]);
    }

    #[test]
    fn test_percentages_single_category() {
        // Scenario: 30 answers, all category "2".
        let answers = vec![Category::Two; 30];
        let counts = tally(&answers);
        assert_eq!(counts.get(Category::Two), 30);
        assert_eq!(percentages(&counts), [0, 100, 0, 0]);
    }

    #[test]
    fn test_percentages_rounding() {
        let counts = CategoryCounts::from_array([1, 1, 1, 0]);
        let pct = percentages(&counts);
        assert_eq!(pct, [33, 33, 33, 0]);
    }
}
