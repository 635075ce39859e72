//! Progress store trait.
//!
//! Defines the interface for durable per-respondent session persistence.

use super::model::Session;
use crate::error::Result;
use crate::transport::RespondentId;
use async_trait::async_trait;

/// Durable per-respondent session storage.
///
/// Writes must be atomic with respect to a concurrent read for the same
/// respondent (no partially-written session is ever observable) and durable
/// across process restart. A missing record is a valid, expected state,
/// not an error.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Inserts or replaces the session for a respondent.
    async fn upsert(&self, respondent: RespondentId, session: &Session) -> Result<()>;

    /// Reads the session for a respondent.
    ///
    /// - `Ok(Some(session))`: a record exists
    /// - `Ok(None)`: the respondent never started or was cleared
    /// - `Err(_)`: storage fault
    async fn get(&self, respondent: RespondentId) -> Result<Option<Session>>;

    /// Removes the session for a respondent. Removing a missing record is
    /// not an error.
    async fn remove(&self, respondent: RespondentId) -> Result<()>;
}
