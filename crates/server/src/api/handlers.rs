use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tsuiseki_core::{
    CommandError, CommandResult, Config, ErrorKind, ResultStatus, SchedulerStatus,
};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

/// GET /api/v1/scheduler/status
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status().await)
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::OK,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Transport => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turn a service command outcome into an HTTP response.
///
/// Structured results keep their body; error results take the status code
/// of their kind. Raw errors only reach here in debug mode.
pub fn command_response(result: Result<CommandResult, CommandError>) -> Response {
    match result {
        Ok(result) => {
            let status = match (result.status, result.error_kind) {
                (ResultStatus::Error, Some(kind)) => status_for_kind(kind),
                (ResultStatus::Error, None) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::OK,
            };
            (status, Json(result)).into_response()
        }
        Err(e) => {
            let kind = e.kind();
            (
                status_for_kind(kind),
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind,
                }),
            )
                .into_response()
        }
    }
}
