use exam_core::model::{RESULT_SCHEMA_VERSION, ResultRecord};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{ResultRepository, ResultRow, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn write_err(e: sqlx::Error) -> StorageError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

fn decode_payload(schema_version: i64, payload: &str) -> Result<ResultRecord, StorageError> {
    if schema_version < 1 || schema_version > i64::from(RESULT_SCHEMA_VERSION) {
        return Err(StorageError::Serialization(format!(
            "unsupported schema version: {schema_version}"
        )));
    }
    serde_json::from_str(payload).map_err(ser)
}

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let schema_version: i64 = row.try_get("schema_version").map_err(ser)?;
    let payload: String = row.try_get("payload").map_err(ser)?;
    Ok(ResultRow::new(id, decode_payload(schema_version, &payload)?))
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, record: &ResultRecord) -> Result<i64, StorageError> {
        let payload = serde_json::to_string(record).map_err(ser)?;
        let overall = record.overall_band.map(|band| i64::from(band.tenths()));

        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    attempt_id, definition, student, started_at, completed_at,
                    overall_band_tenths, schema_version, payload
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(record.attempt_id.to_string())
        .bind(&record.definition)
        .bind(&record.student)
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(overall)
        .bind(i64::from(record.schema_version))
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<ResultRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, schema_version, payload
                FROM exam_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row).map(|r| r.record)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, schema_version, payload
                FROM exam_results
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }
}
