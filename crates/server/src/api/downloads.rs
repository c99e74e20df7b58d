//! Download queue API handlers.
//!
//! An external downloader polls queued tasks and reports progress back.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tsuiseki_core::{DownloadError, DownloadStatus, DownloadTask};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQueryParams {
    #[serde(default)]
    pub status: Option<DownloadStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: DownloadStatus,
}

#[derive(Debug, Serialize)]
pub struct DownloadListResponse {
    pub tasks: Vec<DownloadTask>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DownloadErrorResponse {
    pub error: String,
}

/// GET /api/v1/downloads
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadQueryParams>,
) -> Result<Json<DownloadListResponse>, impl IntoResponse> {
    match state.service().downloader().list(params.status) {
        Ok(tasks) => {
            let total = tasks.len();
            Ok(Json(DownloadListResponse { tasks, total }))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DownloadErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// PUT /api/v1/downloads/{id}/status
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<DownloadTask>, impl IntoResponse> {
    match state.service().downloader().set_status(&id, req.status) {
        Ok(task) => Ok(Json(task)),
        Err(DownloadError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(DownloadErrorResponse {
                error: format!("Download task not found: {}", id),
            }),
        )),
        Err(e @ DownloadError::InvalidTransition { .. }) => Err((
            StatusCode::BAD_REQUEST,
            Json(DownloadErrorResponse {
                error: e.to_string(),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DownloadErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
