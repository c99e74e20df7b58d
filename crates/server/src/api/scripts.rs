//! Scripted series handlers.

use std::sync::Arc;

use axum::{extract::State, response::Response, Json};
use tsuiseki_core::ScriptRequest;

use super::handlers::command_response;
use crate::state::AppState;

/// GET /api/v1/scripts
pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    command_response(state.service().list_scripts().await)
}

/// POST /api/v1/scripts
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScriptRequest>,
) -> Response {
    command_response(state.service().register_script(&req).await)
}
