//! File-backed test result repository.
//!
//! One TOML record per respondent under the results directory; a new
//! attempt replaces the previous record.

use crate::dto::TestResultRecord;
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::task;
use tracing::debug;
use vetter_core::error::Result;
use vetter_core::{RespondentId, ResultRepository, TestResult, TestStatus, VetterError};

pub struct FileResultRepository {
    dir: PathBuf,
}

impl FileResultRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_file(&self, respondent: RespondentId) -> AtomicTomlFile<TestResultRecord> {
        AtomicTomlFile::new(self.dir.join(format!("{respondent}.toml")))
    }
}

fn join_err(e: task::JoinError) -> VetterError {
    VetterError::internal(format!("blocking task failed: {e}"))
}

#[async_trait]
impl ResultRepository for FileResultRepository {
    async fn upsert(&self, result: &TestResult) -> Result<()> {
        let file = self.record_file(result.respondent);
        let record = TestResultRecord::from(result);
        task::spawn_blocking(move || file.save(&record))
            .await
            .map_err(join_err)??;
        debug!(respondent = %result.respondent, status = ?result.status, "test result persisted");
        Ok(())
    }

    async fn get(&self, respondent: RespondentId) -> Result<Option<TestResult>> {
        let file = self.record_file(respondent);
        let record = task::spawn_blocking(move || file.load())
            .await
            .map_err(join_err)??;
        record.map(TestResult::try_from).transpose()
    }

    async fn set_status(&self, respondent: RespondentId, status: TestStatus) -> Result<bool> {
        let file = self.record_file(respondent);
        let updated = task::spawn_blocking(move || -> std::result::Result<bool, VetterError> {
            let Some(mut record) = file.load()? else {
                return Ok(false);
            };
            record.status = status;
            record.updated_at = Utc::now();
            file.save(&record)?;
            Ok(true)
        })
        .await
        .map_err(join_err)??;
        debug!(%respondent, ?status, updated, "test result status change");
        Ok(updated)
    }
}
