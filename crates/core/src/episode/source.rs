//! Episode source trait.

use async_trait::async_trait;
use thiserror::Error;

use super::{Episode, EpisodeSearch};
use crate::catalog::Series;

/// Errors that can occur while obtaining episodes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Episode source connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Episode source API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SourceError {
    /// Whether this failure came from the transport rather than the source's
    /// own bookkeeping.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SourceError::ConnectionFailed(_) | SourceError::ApiError(_) | SourceError::Timeout
        )
    }
}

/// Trait for episode sources.
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch the currently observable episodes of a series.
    ///
    /// When `ignore_old` is set the source may skip rows it considers stale.
    /// At most `max_pages` pages are read.
    async fn fetch_episodes(
        &self,
        series: &Series,
        ignore_old: bool,
        max_pages: u32,
    ) -> Result<Vec<Episode>, SourceError>;

    /// Search episodes by keyword or series tag.
    async fn search(&self, query: &EpisodeSearch) -> Result<Vec<Episode>, SourceError>;
}
