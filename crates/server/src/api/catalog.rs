//! Catalog API handlers.
//!
//! The catalog is fed by an external fetcher that pushes series metadata and
//! observed episodes here.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::info;
use tsuiseki_core::{CatalogStats, Episode, Series};

use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SeriesListResponse {
    pub series: Vec<Series>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Items received.
    pub received: usize,
    /// Items that were not known before.
    pub added: u32,
}

#[derive(Debug, Serialize)]
pub struct CatalogErrorResponse {
    pub error: String,
}

fn internal_error(e: impl ToString) -> (StatusCode, Json<CatalogErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(CatalogErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/catalog/series
pub async fn list_series(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SeriesListResponse>, impl IntoResponse> {
    match state.catalog().list() {
        Ok(series) => {
            let total = series.len();
            Ok(Json(SeriesListResponse { series, total }))
        }
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/catalog/series
///
/// Store or update series metadata.
pub async fn ingest_series(
    State(state): State<Arc<AppState>>,
    Json(series): Json<Vec<Series>>,
) -> Result<Json<IngestResponse>, impl IntoResponse> {
    match state.catalog().store_series(&series) {
        Ok(added) => {
            info!("Ingested {} series ({} new)", series.len(), added);
            Ok(Json(IngestResponse {
                received: series.len(),
                added,
            }))
        }
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/catalog/episodes
///
/// Record observed episodes. Episodes of unknown series are skipped.
pub async fn ingest_episodes(
    State(state): State<Arc<AppState>>,
    Json(episodes): Json<Vec<Episode>>,
) -> Result<Json<IngestResponse>, impl IntoResponse> {
    match state.catalog().store_episodes(&episodes) {
        Ok(added) => {
            info!("Ingested {} episodes ({} new)", episodes.len(), added);
            Ok(Json(IngestResponse {
                received: episodes.len(),
                added,
            }))
        }
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /api/v1/catalog/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStats>, impl IntoResponse> {
    match state.catalog().stats() {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err(internal_error(e)),
    }
}
