use std::sync::Arc;

use chrono::{DateTime, Utc};
use exam_core::band::Band;
use exam_core::model::ResultRecord;
use storage::repository::{ResultRepository, StorageError};

/// One line of the local result history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: i64,
    pub student: String,
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub overall_band: Option<Band>,
}

/// Read side of the result store.
#[derive(Clone)]
pub struct HistoryService {
    results: Arc<dyn ResultRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Most recent attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn recent(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError> {
        let rows = self.results.list_results(limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| HistoryEntry {
                id: row.id,
                student: row.record.student,
                title: row.record.title,
                completed_at: row.record.completed_at,
                overall_band: row.record.overall_band,
            })
            .collect())
    }

    /// Full record for one attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such row.
    pub async fn get(&self, id: i64) -> Result<ResultRecord, StorageError> {
        self.results.get_result(id).await
    }
}
