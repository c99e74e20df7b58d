//! HTTP server for the tsuiseki subscription tracker.

pub mod api;
pub mod metrics;
pub mod state;
