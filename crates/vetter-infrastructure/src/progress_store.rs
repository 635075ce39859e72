//! File-backed progress store.
//!
//! One TOML record per respondent under the progress directory. All file
//! I/O runs on the blocking pool; atomicity and durability come from the
//! atomic TOML layer.

use crate::dto::SessionRecord;
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::task;
use tracing::debug;
use vetter_core::error::Result;
use vetter_core::{ProgressStore, RespondentId, Session, VetterError};

pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_file(&self, respondent: RespondentId) -> AtomicTomlFile<SessionRecord> {
        AtomicTomlFile::new(self.dir.join(format!("{respondent}.toml")))
    }
}

fn join_err(e: task::JoinError) -> VetterError {
    VetterError::internal(format!("blocking task failed: {e}"))
}

#[async_trait]
impl ProgressStore for FileProgressStore {
    async fn upsert(&self, respondent: RespondentId, session: &Session) -> Result<()> {
        let file = self.record_file(respondent);
        let record = SessionRecord::from(session);
        task::spawn_blocking(move || file.save(&record))
            .await
            .map_err(join_err)??;
        debug!(%respondent, "session persisted");
        Ok(())
    }

    async fn get(&self, respondent: RespondentId) -> Result<Option<Session>> {
        let file = self.record_file(respondent);
        let record = task::spawn_blocking(move || file.load())
            .await
            .map_err(join_err)??;
        record.map(Session::try_from).transpose()
    }

    async fn remove(&self, respondent: RespondentId) -> Result<()> {
        let file = self.record_file(respondent);
        task::spawn_blocking(move || file.remove())
            .await
            .map_err(join_err)??;
        debug!(%respondent, "session removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vetter_core::{Category, ConversationState, OptionOrder};

    fn sample_session() -> Session {
        let mut session = Session::with_language("en");
        session.state = ConversationState::Answering;
        session.answers = vec![Category::One];
        session.counts.increment(Category::One);
        session.current_question_index = 1;
        session.record_option_order(0, OptionOrder::identity());
        session
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::new(dir.path());
        let session = sample_session();

        store.upsert(RespondentId(1), &session).await.unwrap();
        let loaded = store.get(RespondentId(1)).await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::new(dir.path());
        assert!(store.get(RespondentId(404)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_survives_new_store_instance() {
        let dir = TempDir::new().unwrap();
        let session = sample_session();
        {
            let store = FileProgressStore::new(dir.path());
            store.upsert(RespondentId(2), &session).await.unwrap();
        }
        // A fresh store over the same directory stands in for a restart.
        let store = FileProgressStore::new(dir.path());
        let loaded = store.get(RespondentId(2)).await.unwrap().unwrap();
        assert_eq!(loaded.answers, session.answers);
        assert_eq!(loaded.option_order(0), session.option_order(0));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::new(dir.path());
        store.upsert(RespondentId(3), &sample_session()).await.unwrap();
        store.remove(RespondentId(3)).await.unwrap();
        store.remove(RespondentId(3)).await.unwrap();
        assert!(store.get(RespondentId(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_record() {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::new(dir.path());
        store.upsert(RespondentId(4), &sample_session()).await.unwrap();

        let mut updated = sample_session();
        updated.answers.push(Category::Three);
        updated.counts.increment(Category::Three);
        updated.current_question_index = 2;
        store.upsert(RespondentId(4), &updated).await.unwrap();

        let loaded = store.get(RespondentId(4)).await.unwrap().unwrap();
        assert_eq!(loaded.answers.len(), 2);
    }
}
