//! Batch history operations.

use crate::types::{
    AudioFormat, BatchId, BatchRecord, BatchState, BatchSummary, DownloadOutcome, OutcomeRecord,
};
use crate::{Error, Result};
use async_trait::async_trait;

use super::{BatchRow, Database, HistoryStore, OutcomeRow};

#[async_trait]
impl HistoryStore for Database {
    async fn begin_batch(&self, total: usize, format: AudioFormat) -> Result<BatchId> {
        let result = sqlx::query(
            r#"
            INSERT INTO batches (format, total, state, started_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(format.to_string())
        .bind(total as i64)
        .bind(BatchState::Running.to_i32())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(BatchId(result.last_insert_rowid()))
    }

    async fn record_outcome(
        &self,
        batch_id: BatchId,
        position: usize,
        outcome: &DownloadOutcome,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO batch_outcomes (
                batch_id, position, task_id, display_name, source_reference,
                succeeded, byte_size, error_detail, file_path, recorded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_id)
        .bind(position as i64)
        .bind(outcome.task.id.as_str())
        .bind(&outcome.task.display_name)
        .bind(&outcome.task.source_reference)
        .bind(outcome.succeeded as i32)
        .bind(outcome.byte_size.map(|b| b as i64))
        .bind(&outcome.error_detail)
        .bind(
            outcome
                .file_path
                .as_ref()
                .and_then(|p| p.to_str().map(String::from)),
        )
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    async fn finish_batch(&self, summary: &BatchSummary) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE batches
            SET state = ?, succeeded = ?, failed = ?, finished_at = ?
            WHERE id = ?
            "#,
        )
        .bind(summary.state.to_i32())
        .bind(summary.succeeded as i64)
        .bind(summary.failed as i64)
        .bind(summary.finished_at.timestamp())
        .bind(summary.batch_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    async fn list_batches(&self, limit: usize, offset: usize) -> Result<Vec<BatchRecord>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, format, total, state, succeeded, failed, started_at, finished_at
            FROM batches
            ORDER BY started_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(BatchRecord::from).collect())
    }

    async fn get_batch(&self, batch_id: BatchId) -> Result<Option<BatchRecord>> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, format, total, state, succeeded, failed, started_at, finished_at
            FROM batches
            WHERE id = ?
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row.map(BatchRecord::from))
    }

    async fn batch_outcomes(&self, batch_id: BatchId) -> Result<Vec<OutcomeRecord>> {
        let rows = sqlx::query_as::<_, OutcomeRow>(
            r#"
            SELECT position, task_id, display_name, source_reference, succeeded,
                   byte_size, error_detail, file_path, recorded_at
            FROM batch_outcomes
            WHERE batch_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(OutcomeRecord::from).collect())
    }

    async fn clear_history(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM batches WHERE state != ?")
            .bind(BatchState::Running.to_i32())
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }

    async fn mark_interrupted(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE batches
            SET state = ?, finished_at = ?
            WHERE state = ?
            "#,
        )
        .bind(BatchState::Failed.to_i32())
        .bind(chrono::Utc::now().timestamp())
        .bind(BatchState::Running.to_i32())
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }
}
