//! Batch submission, progress and playlist handlers.

use super::{BatchAccepted, DownloadPlaylistRequest, ResolvePlaylistRequest, SubmitBatchRequest};
use crate::api::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

fn accepted(batch_id: crate::types::BatchId) -> Response {
    (StatusCode::ACCEPTED, Json(BatchAccepted { batch_id })).into_response()
}

/// GET /progress - Progress of the current (or last) batch
#[utoipa::path(
    get,
    path = "/progress",
    tag = "batches",
    responses(
        (status = 200, description = "Current batch progress", body = crate::types::BatchProgress)
    )
)]
pub async fn get_progress(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.progress().await)
}

/// POST /batches - Start a batch
#[utoipa::path(
    post,
    path = "/batches",
    tag = "batches",
    request_body = SubmitBatchRequest,
    responses(
        (status = 202, description = "Batch started", body = BatchAccepted),
        (status = 409, description = "Another batch is running", body = crate::error::ApiError),
        (status = 422, description = "Batch contains no tasks", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(request): Json<SubmitBatchRequest>,
) -> Response {
    let format = request.format.unwrap_or(state.config.batch.default_format);

    match state.downloader.start_batch(request.tasks, format).await {
        Ok(batch_id) => accepted(batch_id),
        Err(e) => e.into_response(),
    }
}

/// POST /playlists/resolve - Expand a playlist URL into tracks
#[utoipa::path(
    post,
    path = "/playlists/resolve",
    tag = "playlists",
    request_body = ResolvePlaylistRequest,
    responses(
        (status = 200, description = "Resolved playlist", body = crate::types::Playlist),
        (status = 422, description = "Playlist has no tracks", body = crate::error::ApiError),
        (status = 502, description = "Resolver failed", body = crate::error::ApiError)
    )
)]
pub async fn resolve_playlist(
    State(state): State<AppState>,
    Json(request): Json<ResolvePlaylistRequest>,
) -> Response {
    match state.downloader.resolve_playlist(&request.url).await {
        Ok(playlist) => (StatusCode::OK, Json(playlist)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /playlists/download - Resolve a playlist and start its batch
#[utoipa::path(
    post,
    path = "/playlists/download",
    tag = "playlists",
    request_body = DownloadPlaylistRequest,
    responses(
        (status = 202, description = "Batch started", body = BatchAccepted),
        (status = 409, description = "Another batch is running", body = crate::error::ApiError),
        (status = 422, description = "Playlist has no tracks", body = crate::error::ApiError),
        (status = 502, description = "Resolver failed", body = crate::error::ApiError)
    )
)]
pub async fn download_playlist(
    State(state): State<AppState>,
    Json(request): Json<DownloadPlaylistRequest>,
) -> Response {
    let format = request.format.unwrap_or(state.config.batch.default_format);

    match state.downloader.start_playlist(&request.url, format).await {
        Ok(batch_id) => accepted(batch_id),
        Err(e) => e.into_response(),
    }
}
