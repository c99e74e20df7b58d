//! Subscription command handlers.
//!
//! Every handler forwards to one `SubscriptionService` command and returns
//! its `CommandResult` through [`command_response`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use tsuiseki_core::{FilterRequest, RefreshRequest, SearchRequest, SubscriptionStatus};

use super::handlers::command_response;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub name: String,
    #[serde(default)]
    pub episode: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClearParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub episode: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Numeric status code (1 = followed, 2 = updated).
    pub status: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/subscriptions
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Response {
    command_response(state.service().list(params.status).await)
}

/// POST /api/v1/subscriptions
pub async fn add(State(state): State<Arc<AppState>>, Json(req): Json<AddRequest>) -> Response {
    command_response(state.service().add(&req.name, req.episode).await)
}

/// DELETE /api/v1/subscriptions/{name}
pub async fn delete(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    command_response(state.service().delete(Some(&name), false, false).await)
}

/// DELETE /api/v1/subscriptions?confirm=true
///
/// Soft-deletes every active subscription.
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClearParams>,
) -> Response {
    command_response(state.service().delete(None, true, params.confirm).await)
}

/// PUT /api/v1/subscriptions/{name}/filter
pub async fn filter(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<FilterRequest>,
) -> Response {
    command_response(state.service().filter(&name, &req).await)
}

/// POST /api/v1/subscriptions/{name}/mark
pub async fn mark(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<MarkRequest>,
) -> Response {
    command_response(state.service().mark(&name, req.episode).await)
}

/// PUT /api/v1/subscriptions/{name}/status
pub async fn status_change(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Response {
    command_response(state.service().status_change(&name, req.status).await)
}

/// POST /api/v1/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Response {
    command_response(state.service().update(&req).await)
}

/// POST /api/v1/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    command_response(state.service().search(&req).await)
}

/// GET /api/v1/calendar
pub async fn calendar(State(state): State<Arc<AppState>>) -> Response {
    command_response(state.service().calendar().await)
}
