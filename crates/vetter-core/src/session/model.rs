//! Session domain model.
//!
//! The mutable, in-progress record of one respondent's current test
//! attempt. All mutation goes through the conversation engine; the store
//! only ever sees whole records.

use crate::category::{Category, CategoryCounts};
use crate::shuffle::OptionOrder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conversation state of one respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Waiting for the respondent to pick a language.
    LanguageSelection,
    /// Welcome text shown; waiting for consent to take the test.
    Introduction,
    /// Consent given; waiting for the explicit start/decline choice.
    TestChoice,
    /// Progressing through the questionnaire.
    Answering,
    /// First test finished; waiting for the second-test screenshot.
    AwaitingSecondEvidence,
    /// Terminal. A TestResult record has been produced.
    Completed,
}

/// One respondent's test attempt.
///
/// Invariants while `state == Answering`:
/// - `answers.len() == current_question_index`
/// - `counts.total() == answers.len() as u32`
///
/// `option_orders` is write-once per question index: the permutation shown
/// for a question is reused verbatim on any later revisit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Current conversation state.
    pub state: ConversationState,
    /// Selected locale code; immutable for the duration of a test attempt.
    pub language: String,
    /// Zero-based pointer into the active question catalog.
    pub current_question_index: usize,
    /// Ordered category labels, one per answered question so far.
    pub answers: Vec<Category>,
    /// Derived per-category tally; repaired from `answers` on drift.
    pub counts: CategoryCounts,
    /// Option permutation shown per question index (stringified key for
    /// storage-format compatibility). Immutable once written for an index.
    pub option_orders: BTreeMap<String, OptionOrder>,
    /// Transport reference of the latest answer acknowledgement, retracted
    /// on back-navigation.
    pub last_prompt_message: Option<String>,
}

impl Session {
    /// A fresh session at the language-selection stage.
    pub fn new() -> Self {
        Self {
            state: ConversationState::LanguageSelection,
            language: String::new(),
            current_question_index: 0,
            answers: Vec::new(),
            counts: CategoryCounts::new(),
            option_orders: BTreeMap::new(),
            last_prompt_message: None,
        }
    }

    /// A fresh attempt in a chosen language, ready at the introduction.
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            state: ConversationState::Introduction,
            language: language.into(),
            ..Self::new()
        }
    }

    /// Resets all test-attempt fields, keeping the selected language.
    pub fn reset_attempt(&mut self) {
        self.current_question_index = 0;
        self.answers.clear();
        self.counts = CategoryCounts::new();
        self.option_orders.clear();
        self.last_prompt_message = None;
    }

    /// The stored option order for a question index, if one was recorded.
    pub fn option_order(&self, index: usize) -> Option<&OptionOrder> {
        self.option_orders.get(&index.to_string())
    }

    /// Records the option order for a question index.
    ///
    /// A stored order is authoritative: writing to an already-populated
    /// index is ignored so a revisit can never change the mapping the
    /// respondent saw.
    pub fn record_option_order(&mut self, index: usize, order: OptionOrder) {
        self.option_orders.entry(index.to_string()).or_insert(order);
    }

    /// Checks the core answering invariants.
    pub fn invariants_hold(&self) -> bool {
        if self.state != ConversationState::Answering {
            return true;
        }
        self.answers.len() == self.current_question_index
            && self.counts.total() as usize == self.answers.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
