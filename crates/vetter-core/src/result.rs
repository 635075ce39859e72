//! Reviewer-facing test result records.

use crate::category::{Category, CategoryCounts};
use crate::error::Result;
use crate::transport::RespondentId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a test result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    InProgress,
    CompletedFirstTest,
    Completed,
    Accepted,
    Rejected,
}

/// The durable, reviewer-facing record produced by a completed attempt.
///
/// One record per respondent; a retake replaces the previous record rather
/// than appending to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub respondent: RespondentId,
    /// Display name captured from the transport profile.
    pub display_name: String,
    /// Ordered category labels, one per answered question.
    pub answers: Vec<Category>,
    /// Per-category tally, reconciled against `answers` before dispatch.
    pub counts: CategoryCounts,
    pub status: TestStatus,
    pub updated_at: DateTime<Utc>,
}

impl TestResult {
    pub fn new(
        respondent: RespondentId,
        display_name: impl Into<String>,
        answers: Vec<Category>,
        counts: CategoryCounts,
        status: TestStatus,
    ) -> Self {
        Self {
            respondent,
            display_name: display_name.into(),
            answers,
            counts,
            status,
            updated_at: Utc::now(),
        }
    }
}

/// Repository for test result records, keyed by respondent.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Inserts or replaces the record for a respondent.
    async fn upsert(&self, result: &TestResult) -> Result<()>;

    /// Reads the record for a respondent, if any.
    async fn get(&self, respondent: RespondentId) -> Result<Option<TestResult>>;

    /// Updates only the status of an existing record.
    ///
    /// Returns `Ok(false)` when no record exists for the respondent.
    async fn set_status(&self, respondent: RespondentId, status: TestStatus) -> Result<bool>;
}
