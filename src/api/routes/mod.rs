//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`batches`] - Batch submission, progress and playlists
//! - [`history`] - Batch history
//! - [`system`] - Health, events, OpenAPI

use crate::types::{AudioFormat, BatchId, BatchRecord, DownloadTask, OutcomeRecord};
use serde::{Deserialize, Serialize};

mod batches;
mod history;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use batches::*;
pub use history::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /batches
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitBatchRequest {
    /// Tasks in the order they must be downloaded
    pub tasks: Vec<DownloadTask>,
    /// Requested format (defaults to `batch.default_format`)
    #[serde(default)]
    pub format: Option<AudioFormat>,
}

/// Request body for POST /playlists/resolve
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ResolvePlaylistRequest {
    /// Playlist URL
    pub url: String,
}

/// Request body for POST /playlists/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadPlaylistRequest {
    /// Playlist URL
    pub url: String,
    /// Requested format (defaults to `batch.default_format`)
    #[serde(default)]
    pub format: Option<AudioFormat>,
}

/// Response for accepted batches
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct BatchAccepted {
    /// Id of the started batch
    pub batch_id: BatchId,
}

/// Query parameters for GET /history
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HistoryQuery {
    /// Maximum number of items to return (default: 50)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

/// Response for GET /history/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct BatchDetail {
    /// The batch
    pub batch: BatchRecord,
    /// Its outcomes in task order
    pub outcomes: Vec<OutcomeRecord>,
}

/// Response for DELETE /history
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ClearHistoryResponse {
    /// Number of deleted batches
    pub deleted: u64,
}
