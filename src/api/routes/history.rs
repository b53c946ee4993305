//! Batch history handlers.

use super::{BatchDetail, ClearHistoryResponse, HistoryQuery};
use crate::api::AppState;
use crate::error::Error;
use crate::types::BatchId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /history - Batch history (with pagination)
#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of items to return"),
        ("offset" = Option<i64>, Query, description = "Number of items to skip")
    ),
    responses(
        (status = 200, description = "Batches, most recent first", body = Vec<crate::types::BatchRecord>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000) as usize;
    let offset = query.offset.unwrap_or(0).max(0) as usize;

    match state.downloader.history().list_batches(limit, offset).await {
        Ok(items) => (
            StatusCode::OK,
            Json(json!({
                "items": items,
                "limit": limit,
                "offset": offset
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /history/:id - One batch with its outcomes
#[utoipa::path(
    get,
    path = "/history/{id}",
    tag = "history",
    params(
        ("id" = i64, Path, description = "Batch id")
    ),
    responses(
        (status = 200, description = "Batch and outcomes", body = BatchDetail),
        (status = 404, description = "Unknown batch", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_batch(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let history = state.downloader.history();
    let batch_id = BatchId(id);

    let batch = match history.get_batch(batch_id).await {
        Ok(Some(batch)) => batch,
        Ok(None) => return Error::NotFound(format!("batch {}", id)).into_response(),
        Err(e) => return e.into_response(),
    };

    match history.batch_outcomes(batch_id).await {
        Ok(outcomes) => (StatusCode::OK, Json(BatchDetail { batch, outcomes })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /history - Clear finished batches
#[utoipa::path(
    delete,
    path = "/history",
    tag = "history",
    responses(
        (status = 200, description = "Number of deleted batches", body = ClearHistoryResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn clear_history(State(state): State<AppState>) -> Response {
    match state.downloader.history().clear_history().await {
        Ok(deleted) => {
            tracing::info!(deleted, "Cleared batch history");
            (StatusCode::OK, Json(ClearHistoryResponse { deleted })).into_response()
        }
        Err(e) => e.into_response(),
    }
}
