//! Randomized option ordering with a stable reverse mapping.
//!
//! Each question's four options are shown in a uniformly random order,
//! labeled A..D. The permutation recorded at first display is authoritative
//! for the lifetime of the session: revisiting a question (back-navigation)
//! must reuse the stored order verbatim, otherwise the letter the
//! respondent is looking at would silently point at a different option.

use crate::catalog::Question;
use crate::category::{CATEGORY_COUNT, Category, Letter};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A fixed permutation of the four categories.
///
/// Position `i` holds the category displayed under letter `Letter::ALL[i]`.
/// Immutable once recorded for a question index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionOrder([Category; CATEGORY_COUNT]);

impl OptionOrder {
    /// Draws a uniformly random permutation.
    pub fn shuffle<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut categories = Category::ALL;
        categories.shuffle(rng);
        Self(categories)
    }

    /// The identity order (letter A = category 1, ... letter D = category 4).
    /// Used only by tests that need a predictable layout.
    pub fn identity() -> Self {
        Self(Category::ALL)
    }

    /// Builds an order from an explicit permutation.
    ///
    /// Returns `None` unless the array is a permutation of all four
    /// categories (the only shape a stored order may have).
    pub fn from_permutation(categories: [Category; CATEGORY_COUNT]) -> Option<Self> {
        let mut seen = [false; CATEGORY_COUNT];
        for category in categories {
            if seen[category.index()] {
                return None;
            }
            seen[category.index()] = true;
        }
        Some(Self(categories))
    }

    /// Translates a respondent's letter choice back to the canonical category.
    pub fn letter_to_category(&self, letter: Letter) -> Category {
        self.0[letter.index()]
    }

    /// Display pairs `(letter, option text)` for one question, in slot order.
    pub fn display_options<'q>(&self, question: &'q Question) -> Vec<(Letter, &'q str)> {
        Letter::ALL
            .iter()
            .map(|letter| (*letter, question.option_text(self.letter_to_category(*letter))))
            .collect()
    }

    /// The raw permutation in slot order.
    pub fn categories(&self) -> &[Category; CATEGORY_COUNT] {
        &self.0
    }
}
