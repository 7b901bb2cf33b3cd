use async_trait::async_trait;
use exam_core::model::ResultRecord;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored result together with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub record: ResultRecord,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: i64, record: ResultRecord) -> Self {
        Self { id, record }
    }
}

/// Append-only history of finished attempts.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Append a finished attempt and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt id was already stored,
    /// or other storage errors.
    async fn append_result(&self, record: &ResultRecord) -> Result<i64, StorageError>;

    /// Fetch a stored attempt by row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<ResultRecord, StorageError>;

    /// List the most recent attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails or a payload cannot be decoded.
    async fn list_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, record: &ResultRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|row| row.record.attempt_id == record.attempt_id)
        {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("row id overflow".into()))?
            + 1;
        guard.push(ResultRow::new(id, record.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<ResultRecord, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.record.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let results: Arc<dyn ResultRepository> = Arc::new(InMemoryRepository::new());
        Self { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::band::Band;
    use exam_core::model::{ObjectiveScore, RESULT_SCHEMA_VERSION, Section};
    use exam_core::time::fixed_now;
    use uuid::Uuid;

    fn build_record(student: &str) -> ResultRecord {
        ResultRecord {
            schema_version: RESULT_SCHEMA_VERSION,
            attempt_id: Uuid::new_v4(),
            definition: "practice".into(),
            title: "IELTS Practice Test".into(),
            student: student.into(),
            started_at: fixed_now(),
            completed_at: fixed_now(),
            objective: vec![ObjectiveScore {
                section: Section::Reading,
                score: 3,
                total: 5,
                percentage: 60,
                band: Band::from_tenths(65),
            }],
            written: Vec::new(),
            responses: Vec::new(),
            overall_band: Some(Band::from_tenths(65)),
            completed: true,
        }
    }

    #[tokio::test]
    async fn appends_and_lists_newest_first() {
        let repo = InMemoryRepository::new();
        let first = repo.append_result(&build_record("first")).await.unwrap();
        let second = repo.append_result(&build_record("second")).await.unwrap();
        assert!(second > first);

        let rows = repo.list_results(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.student, "second");
        assert_eq!(repo.list_results(1).await.unwrap().len(), 1);

        let fetched = repo.get_result(first).await.unwrap();
        assert_eq!(fetched.student, "first");
        assert!(matches!(
            repo.get_result(99).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn same_attempt_is_not_stored_twice() {
        let repo = InMemoryRepository::new();
        let record = build_record("a");
        repo.append_result(&record).await.unwrap();
        assert!(matches!(
            repo.append_result(&record).await.unwrap_err(),
            StorageError::Conflict
        ));
    }
}
