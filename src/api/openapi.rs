//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the playlist-dl REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the playlist-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "playlist-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting paced download batches, following their progress and browsing batch history",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Batches
        crate::api::routes::get_progress,
        crate::api::routes::submit_batch,

        // Playlists
        crate::api::routes::resolve_playlist,
        crate::api::routes::download_playlist,

        // History
        crate::api::routes::get_history,
        crate::api::routes::get_batch,
        crate::api::routes::clear_history,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::BatchId,
        crate::types::TaskId,
        crate::types::DownloadTask,
        crate::types::AudioFormat,
        crate::types::BatchState,
        crate::types::BatchProgress,
        crate::types::DownloadOutcome,
        crate::types::BatchSummary,
        crate::types::Event,
        crate::types::Track,
        crate::types::Playlist,
        crate::types::BatchRecord,
        crate::types::OutcomeRecord,

        // Config types from config.rs
        crate::config::Config,
        crate::config::BatchConfig,
        crate::config::FetchConfig,
        crate::config::RetryConfig,
        crate::config::PersistenceConfig,
        crate::config::ApiConfig,
        crate::config::FileCollisionAction,

        // API request/response types from routes
        crate::api::routes::SubmitBatchRequest,
        crate::api::routes::ResolvePlaylistRequest,
        crate::api::routes::DownloadPlaylistRequest,
        crate::api::routes::BatchAccepted,
        crate::api::routes::BatchDetail,
        crate::api::routes::ClearHistoryResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "batches", description = "Batches - Submit a batch and follow its progress"),
        (name = "playlists", description = "Playlists - Resolve playlist URLs and download them as a batch"),
        (name = "history", description = "History - Finished batches and their per-task outcomes"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
