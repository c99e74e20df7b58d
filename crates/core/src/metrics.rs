//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Refresh cycles (duration, per-series outcomes, queued episodes)
//! - Subscription lifecycle transitions
//! - Episode source requests

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Refresh Metrics
// =============================================================================

/// Refresh cycles total by trigger.
pub static REFRESH_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tsuiseki_refresh_cycles_total", "Total refresh cycles run"),
        &["trigger"], // "scheduler", "manual"
    )
    .unwrap()
});

/// Refresh cycle duration in seconds.
pub static REFRESH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tsuiseki_refresh_duration_seconds",
            "Duration of refresh cycles",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &[],
    )
    .unwrap()
});

/// Per-series refresh outcomes.
pub static SERIES_REFRESHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tsuiseki_series_refreshed_total",
            "Total series processed by refresh cycles",
        ),
        &["result"], // "updated", "unchanged", "failed"
    )
    .unwrap()
});

/// Episodes handed to the download queue.
pub static EPISODES_QUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tsuiseki_episodes_queued_total",
        "Total episodes queued for download",
    )
    .unwrap()
});

/// Failed downloads re-offered to the queue.
pub static DOWNLOADS_REQUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tsuiseki_downloads_requeued_total",
        "Total failed downloads re-offered",
    )
    .unwrap()
});

// =============================================================================
// Subscription Metrics
// =============================================================================

/// Subscription transitions by target status.
pub static SUBSCRIPTION_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tsuiseki_subscription_transitions_total",
            "Total subscription status transitions",
        ),
        &["operation", "status"],
    )
    .unwrap()
});

/// Updated subscriptions expired back to followed.
pub static STALE_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tsuiseki_stale_expired_total",
        "Total updated subscriptions reverted by the staleness sweep",
    )
    .unwrap()
});

// =============================================================================
// Episode Source Metrics
// =============================================================================

/// Episode source requests total.
pub static SOURCE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tsuiseki_source_requests_total",
            "Total episode source requests",
        ),
        &["source", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Refresh
        Box::new(REFRESH_CYCLES.clone()),
        Box::new(REFRESH_DURATION.clone()),
        Box::new(SERIES_REFRESHED.clone()),
        Box::new(EPISODES_QUEUED.clone()),
        Box::new(DOWNLOADS_REQUEUED.clone()),
        // Subscriptions
        Box::new(SUBSCRIPTION_TRANSITIONS.clone()),
        Box::new(STALE_EXPIRED.clone()),
        // Episode source
        Box::new(SOURCE_REQUESTS.clone()),
    ]
}
