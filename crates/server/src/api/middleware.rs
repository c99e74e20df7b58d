//! Request metrics for API routes.
//!
//! Every request is recorded by method, normalized path and status. Requests
//! that run a subscription command are also counted per command, so the
//! dashboard can tell a failing `refresh` from a rejected `add` without
//! parsing paths.

use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::metrics::{
    normalize_path, HTTP_COMMANDS_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};

/// Command run by a request, keyed on method and normalized path.
pub fn command_for(method: &Method, path: &str) -> Option<&'static str> {
    let route = path.strip_prefix("/api/v1")?;
    let command = match (method.as_str(), route) {
        ("GET", "/subscriptions") => "list",
        ("POST", "/subscriptions") => "add",
        ("DELETE", "/subscriptions") => "clear",
        ("DELETE", "/subscriptions/{name}") => "delete",
        ("PUT", "/subscriptions/{name}/filter") => "filter",
        ("POST", "/subscriptions/{name}/mark") => "mark",
        ("PUT", "/subscriptions/{name}/status") => "status",
        ("POST", "/refresh") => "update",
        ("POST", "/search") => "search",
        ("GET", "/calendar") => "calendar",
        ("GET", "/scripts") => "scripts",
        ("POST", "/scripts") => "script",
        ("PUT", "/downloads/{id}/status") => "download_status",
        ("POST", "/catalog/series") | ("POST", "/catalog/episodes") => "ingest",
        _ => return None,
    };
    Some(command)
}

/// Outcome label for a response status.
fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "failed"
    } else if status.is_client_error() {
        "rejected"
    } else {
        "ok"
    }
}

/// Record duration, count and in-flight requests, plus the per-command
/// counter for command routes.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());
    let command = command_for(&method, &path);

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let status = response.status();
    let labels = [method.as_str(), path.as_str(), status.as_str()];
    HTTP_REQUEST_DURATION
        .with_label_values(&labels)
        .observe(started.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();

    if let Some(command) = command {
        HTTP_COMMANDS_TOTAL
            .with_label_values(&[command, outcome(status)])
            .inc();
    }

    response
}
