//! Answer categories, display letters, and per-category tallies.
//!
//! Every question offers exactly four options, one per category. Categories
//! are the canonical scoring labels ("1".."4"); letters (A..D) are the
//! randomized on-screen assignment and are never persisted as answers.

use serde::{Deserialize, Serialize};

/// One of the four fixed answer classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

/// Number of answer categories. Structural constant, not configurable.
pub const CATEGORY_COUNT: usize = 4;

impl Category {
    /// All categories in label order.
    pub const ALL: [Category; CATEGORY_COUNT] =
        [Category::One, Category::Two, Category::Three, Category::Four];

    /// The canonical label ("1".."4") used in persisted records and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Category::One => "1",
            Category::Two => "2",
            Category::Three => "3",
            Category::Four => "4",
        }
    }

    /// Zero-based position in [`Category::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Category::One => 0,
            Category::Two => 1,
            Category::Three => 2,
            Category::Four => 3,
        }
    }

    /// Parses a canonical label back into a category.
    pub fn from_label(label: &str) -> Option<Category> {
        match label {
            "1" => Some(Category::One),
            "2" => Some(Category::Two),
            "3" => Some(Category::Three),
            "4" => Some(Category::Four),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// On-screen answer letter assigned to a shuffled option slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    /// All letters in display order.
    pub const ALL: [Letter; CATEGORY_COUNT] = [Letter::A, Letter::B, Letter::C, Letter::D];

    /// Zero-based slot position (A = 0 .. D = 3).
    pub fn index(&self) -> usize {
        match self {
            Letter::A => 0,
            Letter::B => 1,
            Letter::C => 2,
            Letter::D => 3,
        }
    }

    /// Parses a single-letter answer ("A".."D", case-insensitive).
    pub fn parse(input: &str) -> Option<Letter> {
        match input.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Letter::A),
            "B" => Some(Letter::B),
            "C" => Some(Letter::C),
            "D" => Some(Letter::D),
            _ => None,
        }
    }
}

impl std::fmt::Display for Letter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
        };
        f.write_str(s)
    }
}

/// Per-category answer tally.
///
/// This is a derived cache over the answer list. The answer list is the
/// source of truth; whenever `total()` disagrees with the list length the
/// counts must be rebuilt from scratch (see `score::reconcile`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts([u32; CATEGORY_COUNT]);

impl CategoryCounts {
    /// An all-zero tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds counts from raw per-category values in label order.
    pub fn from_array(counts: [u32; CATEGORY_COUNT]) -> Self {
        Self(counts)
    }

    /// The count recorded for one category.
    pub fn get(&self, category: Category) -> u32 {
        self.0[category.index()]
    }

    /// Records one more answer for the category.
    pub fn increment(&mut self, category: Category) {
        self.0[category.index()] += 1;
    }

    /// Removes one answer for the category. Saturates at zero so a drifted
    /// cache cannot underflow; drift is repaired by reconciliation.
    pub fn decrement(&mut self, category: Category) {
        let slot = &mut self.0[category.index()];
        *slot = slot.saturating_sub(1);
    }

    /// Sum over all categories.
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Iterates `(category, count)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL.iter().map(|c| (*c, self.get(*c)))
    }
}
