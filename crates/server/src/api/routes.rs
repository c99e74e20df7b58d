use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::metrics_middleware;
use super::{catalog, downloads, handlers, scripts, subscriptions};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/scheduler/status", get(handlers::scheduler_status))
        // Subscriptions
        .route(
            "/subscriptions",
            get(subscriptions::list)
                .post(subscriptions::add)
                .delete(subscriptions::clear),
        )
        .route("/subscriptions/{name}", delete(subscriptions::delete))
        .route("/subscriptions/{name}/filter", put(subscriptions::filter))
        .route("/subscriptions/{name}/mark", post(subscriptions::mark))
        .route(
            "/subscriptions/{name}/status",
            put(subscriptions::status_change),
        )
        .route("/refresh", post(subscriptions::refresh))
        .route("/search", post(subscriptions::search))
        .route("/calendar", get(subscriptions::calendar))
        // Scripted series
        .route("/scripts", get(scripts::list).post(scripts::register))
        // Catalog (fed by the external fetcher)
        .route(
            "/catalog/series",
            get(catalog::list_series).post(catalog::ingest_series),
        )
        .route("/catalog/episodes", post(catalog::ingest_episodes))
        .route("/catalog/stats", get(catalog::get_stats))
        // Download queue
        .route("/downloads", get(downloads::list_downloads))
        .route("/downloads/{id}/status", put(downloads::set_status))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
