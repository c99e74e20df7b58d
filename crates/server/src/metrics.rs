//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the tsuiseki server:
//! - HTTP request metrics (latency, counts, per-command outcomes)
//! - Subscription and download queue gauges (collected dynamically)
//! - Refresh cycle metrics registered from the core crate

use std::collections::HashMap;

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tracing::warn;
use tsuiseki_core::{DownloadStatus, SubscriptionFilter, SubscriptionStatus};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tsuiseki_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tsuiseki_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tsuiseki_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// API requests that ran a subscription command, by command and outcome.
pub static HTTP_COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tsuiseki_http_commands_total",
            "Total API requests per subscription command",
        ),
        &["command", "outcome"],
    )
    .unwrap()
});

// =============================================================================
// Subscription Metrics (collected dynamically)
// =============================================================================

/// Subscriptions by current status.
pub static SUBSCRIPTIONS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "tsuiseki_subscriptions_by_status",
            "Current subscription count by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Download tasks by current status.
pub static DOWNLOADS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "tsuiseki_downloads_by_status",
            "Current download task count by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Scheduler running state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tsuiseki_scheduler_running",
        "Whether the refresh scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Known series in the catalog.
pub static CATALOG_SERIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("tsuiseki_catalog_series", "Number of series in the catalog").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_COMMANDS_TOTAL.clone()))
        .unwrap();

    // Subscriptions and downloads
    registry
        .register(Box::new(SUBSCRIPTIONS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(DOWNLOADS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_SERIES.clone()))
        .unwrap();

    // Core metrics (refresh cycles, transitions, episode source)
    for metric in tsuiseki_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the stores' current contents.
pub fn collect_dynamic_metrics(state: &AppState) {
    SCHEDULER_RUNNING.set(i64::from(state.scheduler().is_running()));

    if let Ok(stats) = state.catalog().stats() {
        CATALOG_SERIES.set(stats.total_series as i64);
    }

    let filter = SubscriptionFilter::new().with_deleted();
    if let Ok(subscriptions) = state.service().store().list(&filter) {
        for status in [
            SubscriptionStatus::Deleted,
            SubscriptionStatus::Followed,
            SubscriptionStatus::Updated,
        ] {
            let count = subscriptions.iter().filter(|s| s.status == status).count();
            SUBSCRIPTIONS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count as i64);
        }
    }

    if let Ok(tasks) = state.service().downloader().list(None) {
        let mut counts: HashMap<DownloadStatus, i64> = HashMap::new();
        for task in &tasks {
            *counts.entry(task.status).or_default() += 1;
        }
        for status in [
            DownloadStatus::Queued,
            DownloadStatus::InProgress,
            DownloadStatus::Failed,
            DownloadStatus::Done,
        ] {
            DOWNLOADS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(counts.get(&status).copied().unwrap_or(0));
        }
    }
}

static UUID_RE: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static SUBSCRIPTION_NAME_RE: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"^(/api/v1/subscriptions)/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs and series names with
/// placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = SUBSCRIPTION_NAME_RE.replace(&result, "$1/{name}");
    result.to_string()
}
