//! Mock episode source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::Series;
use crate::episode::{Episode, EpisodeSearch, EpisodeSource, SourceError};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub series_name: String,
    pub ignore_old: bool,
    pub max_pages: u32,
}

/// Mock implementation of the EpisodeSource trait.
///
/// Provides controllable behavior for testing:
/// - Return configured episodes per series
/// - Fail fetches for specific series
/// - Record fetches for assertions
///
/// # Example
///
/// ```rust,ignore
/// use tsuiseki_core::testing::{MockEpisodeSource, fixtures};
///
/// let source = MockEpisodeSource::new();
/// source.set_episodes("Show A", vec![fixtures::episode("Show A", 4, "g1")]).await;
/// source.fail_series("Show B", "connection refused").await;
///
/// // Refresh cycles now see episode 4 for Show A and a transport
/// // failure for Show B.
/// ```
#[derive(Debug, Default)]
pub struct MockEpisodeSource {
    /// Episodes returned per series.
    episodes: Arc<RwLock<HashMap<String, Vec<Episode>>>>,
    /// Results returned by searches.
    search_results: Arc<RwLock<Vec<Episode>>>,
    /// Series whose fetches fail with a connection error.
    failing: Arc<RwLock<HashMap<String, String>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<SourceError>>>,
    /// Recorded fetches.
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// Recorded searches.
    searches: Arc<RwLock<Vec<EpisodeSearch>>>,
}

impl MockEpisodeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the episodes observable for a series.
    pub async fn set_episodes(&self, series_name: &str, episodes: Vec<Episode>) {
        self.episodes
            .write()
            .await
            .insert(series_name.to_string(), episodes);
    }

    /// Make every fetch for a series fail with a connection error.
    pub async fn fail_series(&self, series_name: &str, reason: &str) {
        self.failing
            .write()
            .await
            .insert(series_name.to_string(), reason.to_string());
    }

    /// Stop failing fetches for a series.
    pub async fn recover_series(&self, series_name: &str) {
        self.failing.write().await.remove(series_name);
    }

    /// Set the results returned by searches.
    pub async fn set_search_results(&self, episodes: Vec<Episode>) {
        *self.search_results.write().await = episodes;
    }

    /// Make the next call fail.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn recorded_searches(&self) -> Vec<EpisodeSearch> {
        self.searches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl EpisodeSource for MockEpisodeSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_episodes(
        &self,
        series: &Series,
        ignore_old: bool,
        max_pages: u32,
    ) -> Result<Vec<Episode>, SourceError> {
        self.fetches.write().await.push(RecordedFetch {
            series_name: series.name.clone(),
            ignore_old,
            max_pages,
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(reason) = self.failing.read().await.get(&series.name) {
            return Err(SourceError::ConnectionFailed(reason.clone()));
        }

        Ok(self
            .episodes
            .read()
            .await
            .get(&series.name)
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &EpisodeSearch) -> Result<Vec<Episode>, SourceError> {
        self.searches.write().await.push(query.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.search_results.read().await.clone())
    }
}
