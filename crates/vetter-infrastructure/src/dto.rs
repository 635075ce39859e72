//! Storage DTOs.
//!
//! The on-disk record shapes are pinned here, decoupled from the domain
//! types so a domain refactor cannot silently change the storage format.
//! Records carry a schema version; loading rejects unknown versions and
//! unknown fields outright rather than guessing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vetter_core::{
    Category, CategoryCounts, ConversationState, OptionOrder, RespondentId, Session, TestResult,
    TestStatus, VetterError, CATEGORY_COUNT,
};

/// Current on-disk schema version for both record kinds.
pub const SCHEMA_VERSION: u32 = 1;

fn check_version(found: u32, kind: &str) -> Result<(), VetterError> {
    if found != SCHEMA_VERSION {
        return Err(VetterError::data_access(format!(
            "unsupported {kind} record schema version {found} (expected {SCHEMA_VERSION})"
        )));
    }
    Ok(())
}

/// On-disk shape of one session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionRecord {
    pub schema_version: u32,
    pub state: ConversationState,
    pub language: String,
    pub current_question_index: usize,
    #[serde(default)]
    pub answers: Vec<Category>,
    #[serde(default)]
    pub counts: CategoryCounts,
    /// Raw permutation per stringified question index; validated on load.
    #[serde(default)]
    pub option_orders: BTreeMap<String, [Category; CATEGORY_COUNT]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_prompt_message: Option<String>,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            state: session.state,
            language: session.language.clone(),
            current_question_index: session.current_question_index,
            answers: session.answers.clone(),
            counts: session.counts,
            option_orders: session
                .option_orders
                .iter()
                .map(|(key, order)| (key.clone(), *order.categories()))
                .collect(),
            last_prompt_message: session.last_prompt_message.clone(),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = VetterError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        check_version(record.schema_version, "session")?;

        let mut option_orders = BTreeMap::new();
        for (key, raw) in record.option_orders {
            key.parse::<usize>().map_err(|_| {
                VetterError::data_access(format!("invalid option order key '{key}'"))
            })?;
            let order = OptionOrder::from_permutation(raw).ok_or_else(|| {
                VetterError::data_access(format!(
                    "option order for question {key} is not a permutation"
                ))
            })?;
            option_orders.insert(key, order);
        }

        Ok(Session {
            state: record.state,
            language: record.language,
            current_question_index: record.current_question_index,
            answers: record.answers,
            counts: record.counts,
            option_orders,
            last_prompt_message: record.last_prompt_message,
        })
    }
}

/// On-disk shape of one test result record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestResultRecord {
    pub schema_version: u32,
    pub respondent: i64,
    pub display_name: String,
    #[serde(default)]
    pub answers: Vec<Category>,
    #[serde(default)]
    pub counts: CategoryCounts,
    pub status: TestStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&TestResult> for TestResultRecord {
    fn from(result: &TestResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            respondent: result.respondent.0,
            display_name: result.display_name.clone(),
            answers: result.answers.clone(),
            counts: result.counts,
            status: result.status,
            updated_at: result.updated_at,
        }
    }
}

impl TryFrom<TestResultRecord> for TestResult {
    type Error = VetterError;

    fn try_from(record: TestResultRecord) -> Result<Self, Self::Error> {
        check_version(record.schema_version, "test result")?;
        Ok(TestResult {
            respondent: RespondentId(record.respondent),
            display_name: record.display_name,
            answers: record.answers,
            counts: record.counts,
            status: record.status,
            updated_at: record.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        let mut session = Session::with_language("en");
        session.state = ConversationState::Answering;
        session.answers = vec![Category::Two, Category::Four];
        session.counts.increment(Category::Two);
        session.counts.increment(Category::Four);
        session.current_question_index = 2;
        session.record_option_order(0, OptionOrder::identity());
        session.last_prompt_message = Some("msg-9".to_string());
        session
    }

    #[test]
    fn test_session_round_trips_through_record() {
        let session = sample_session();
        let record = SessionRecord::from(&session);
        let restored = Session::try_from(record).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_unknown_schema_version_is_rejected() {
        let mut record = SessionRecord::from(&sample_session());
        record.schema_version = 99;
        assert!(Session::try_from(record).is_err());
    }

    #[test]
    fn test_corrupt_permutation_is_rejected() {
        let mut record = SessionRecord::from(&sample_session());
        record.option_orders.insert(
            "1".to_string(),
            [Category::One, Category::One, Category::Two, Category::Three],
        );
        assert!(Session::try_from(record).is_err());
    }

    #[test]
    fn test_unknown_field_fails_parse() {
        let toml = r#"
            schema_version = 1
            state = "answering"
            language = "en"
            current_question_index = 0
            surprise = true
        "#;
        assert!(toml::from_str::<SessionRecord>(toml).is_err());
    }

    #[test]
    fn test_result_round_trips_through_record() {
        let result = TestResult::new(
            RespondentId(5),
            "Someone",
            vec![Category::One],
            {
                let mut counts = CategoryCounts::new();
                counts.increment(Category::One);
                counts
            },
            TestStatus::Completed,
        );
        let record = TestResultRecord::from(&result);
        let restored = TestResult::try_from(record).unwrap();
        assert_eq!(restored, result);
    }
}
