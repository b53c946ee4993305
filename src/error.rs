//! Error types for playlist-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Batch, Fetch, Database)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
///
/// Per-task failures inside a batch never surface as this type; they are
/// converted into failed outcomes. `Error` is returned for failures that
/// prevent a batch from starting or that happen outside the batch loop.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.base_url")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Batch could not be started
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// A collaborator failed to fetch a payload or a playlist
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Playlist resolved to zero tracks
    #[error("playlist {0} contains no tracks")]
    EmptyPlaylist(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new batches
    #[error("shutdown in progress: not accepting new batches")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// File could not be saved
    #[error("failed to save {}: {reason}", .path.display())]
    Save {
        /// Target path of the save
        path: PathBuf,
        /// Why the save failed
        reason: String,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Reasons a batch is refused before the loop starts
#[derive(Debug, Error)]
pub enum BatchError {
    /// Batches must contain at least one task
    #[error("batch contains no tasks")]
    EmptyBatch,

    /// Only one batch runs at a time
    #[error("batch {active} is still running")]
    AlreadyRunning {
        /// Id of the batch currently in flight (0 while it is being registered)
        active: i64,
    },
}

/// Failure of the "download one item" collaborator
///
/// `Network` covers transport failures (connect, timeout, reset),
/// `Remote` covers non-success HTTP responses.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("network error: {message}")]
    Network {
        /// Description of the transport failure
        message: String,
        /// Whether the failure looks transient (timeout, refused connection)
        transient: bool,
    },

    /// Remote endpoint answered with a non-success status
    #[error("remote error {status}: {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Error message reported by the remote, or the status reason
        message: String,
    },

    /// Remote answered successfully but sent no bytes
    #[error("remote returned an empty payload")]
    EmptyPayload,

    /// Response could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network {
            transient: e.is_timeout() || e.is_connect(),
            message: e.to_string(),
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "batch_running",
///     "message": "batch error: batch 4 is still running",
///     "details": { "active_batch_id": 4 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "empty_batch")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,

            Error::NotFound(_) => 404,

            Error::Batch(BatchError::AlreadyRunning { .. }) => 409,

            Error::Batch(BatchError::EmptyBatch) => 422,
            Error::EmptyPlaylist(_) => 422,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Save { .. } => 500,

            // Upstream resolver / download endpoint failures
            Error::Fetch(_) => 502,
            Error::Network(_) => 502,

            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Batch(e) => match e {
                BatchError::EmptyBatch => "empty_batch",
                BatchError::AlreadyRunning { .. } => "batch_running",
            },
            Error::Fetch(e) => match e {
                FetchError::Network { .. } => "network_error",
                FetchError::Remote { .. } => "remote_error",
                FetchError::EmptyPayload => "empty_payload",
                FetchError::InvalidResponse(_) => "invalid_response",
            },
            Error::EmptyPlaylist(_) => "empty_playlist",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Save { .. } => "save_failed",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Batch(BatchError::AlreadyRunning { active }) => Some(serde_json::json!({
                "active_batch_id": active,
            })),
            Error::Fetch(FetchError::Remote { status, .. }) => Some(serde_json::json!({
                "upstream_status": status,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Save { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            _ => None,
        };

        Self {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
