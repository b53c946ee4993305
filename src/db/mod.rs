//! Database layer for playlist-dl
//!
//! Persists batch history in SQLite. The batch loop only ever talks to the
//! [`HistoryStore`] trait, so persistence can be swapped out or disabled.
//!
//! ## Submodules
//!
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`history`] - Batch and outcome records

use crate::Result;
use crate::types::{
    AudioFormat, BatchId, BatchRecord, BatchState, BatchSummary, DownloadOutcome, DownloadTask,
    OutcomeRecord,
};
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

mod history;
mod migrations;

/// Storage port for batch history
///
/// Implemented by [`Database`] (SQLite) and [`NoOpHistoryStore`].
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record a new running batch and hand out its id
    async fn begin_batch(&self, total: usize, format: AudioFormat) -> Result<BatchId>;

    /// Record the outcome of the task at `position`
    async fn record_outcome(
        &self,
        batch_id: BatchId,
        position: usize,
        outcome: &DownloadOutcome,
    ) -> Result<()>;

    /// Store the terminal state and counters of a batch
    async fn finish_batch(&self, summary: &BatchSummary) -> Result<()>;

    /// Batches, most recent first
    async fn list_batches(&self, limit: usize, offset: usize) -> Result<Vec<BatchRecord>>;

    /// A single batch
    async fn get_batch(&self, batch_id: BatchId) -> Result<Option<BatchRecord>>;

    /// Outcomes of a batch in task order
    async fn batch_outcomes(&self, batch_id: BatchId) -> Result<Vec<OutcomeRecord>>;

    /// Delete every batch that is not running, returns the number deleted
    async fn clear_history(&self) -> Result<u64>;

    /// Mark batches left `Running` by a previous process as `Failed`
    async fn mark_interrupted(&self) -> Result<u64>;
}

/// History store used when persistence is disabled
///
/// Hands out increasing batch ids and stores nothing.
#[derive(Debug, Default)]
pub struct NoOpHistoryStore {
    next_id: AtomicI64,
}

impl NoOpHistoryStore {
    /// Create a new no-op store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for NoOpHistoryStore {
    async fn begin_batch(&self, _total: usize, _format: AudioFormat) -> Result<BatchId> {
        Ok(BatchId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn record_outcome(
        &self,
        _batch_id: BatchId,
        _position: usize,
        _outcome: &DownloadOutcome,
    ) -> Result<()> {
        Ok(())
    }

    async fn finish_batch(&self, _summary: &BatchSummary) -> Result<()> {
        Ok(())
    }

    async fn list_batches(&self, _limit: usize, _offset: usize) -> Result<Vec<BatchRecord>> {
        Ok(Vec::new())
    }

    async fn get_batch(&self, _batch_id: BatchId) -> Result<Option<BatchRecord>> {
        Ok(None)
    }

    async fn batch_outcomes(&self, _batch_id: BatchId) -> Result<Vec<OutcomeRecord>> {
        Ok(Vec::new())
    }

    async fn clear_history(&self) -> Result<u64> {
        Ok(0)
    }

    async fn mark_interrupted(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Batch record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct BatchRow {
    /// Unique database ID
    pub id: i64,
    /// Requested format (`mp3`, `m4a`, ...)
    pub format: String,
    /// Number of tasks
    pub total: i64,
    /// Batch state code
    pub state: i32,
    /// Successful tasks
    pub succeeded: i64,
    /// Failed tasks
    pub failed: i64,
    /// Unix timestamp when the batch started
    pub started_at: i64,
    /// Unix timestamp when the batch finished
    pub finished_at: Option<i64>,
}

impl From<BatchRow> for BatchRecord {
    fn from(row: BatchRow) -> Self {
        BatchRecord {
            id: BatchId(row.id),
            format: row.format.parse().unwrap_or_default(),
            total: row.total.max(0) as usize,
            state: BatchState::from_i32(row.state),
            succeeded: row.succeeded.max(0) as usize,
            failed: row.failed.max(0) as usize,
            started_at: row.started_at,
            finished_at: row.finished_at,
        }
    }
}

/// Outcome record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct OutcomeRow {
    /// Position of the task in its batch
    pub position: i64,
    /// Task key
    pub task_id: String,
    /// Task display name
    pub display_name: String,
    /// Task source reference
    pub source_reference: String,
    /// 1 if the task succeeded
    pub succeeded: i32,
    /// Saved size in bytes
    pub byte_size: Option<i64>,
    /// Failure message
    pub error_detail: Option<String>,
    /// Saved file path
    pub file_path: Option<String>,
    /// Unix timestamp of the attempt's end
    pub recorded_at: i64,
}

impl From<OutcomeRow> for OutcomeRecord {
    fn from(row: OutcomeRow) -> Self {
        OutcomeRecord {
            position: row.position.max(0) as usize,
            outcome: DownloadOutcome {
                task: DownloadTask::new(row.task_id, row.display_name, row.source_reference),
                succeeded: row.succeeded != 0,
                byte_size: row.byte_size.map(|b| b.max(0) as u64),
                error_detail: row.error_detail,
                file_path: row.file_path.map(PathBuf::from),
            },
            recorded_at: row.recorded_at,
        }
    }
}

/// Database handle for playlist-dl
pub struct Database {
    pool: SqlitePool,
}
