//! Series catalog - metadata about the series that can be followed.
//!
//! The catalog is read-only from the subscription core's point of view. The
//! SQLite implementation also accepts ingestion of series and observed
//! episodes pushed by an external fetcher, and doubles as an
//! `EpisodeSource` over those episodes.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

use crate::episode::Episode;

/// Trait for series catalog storage.
pub trait SeriesCatalog: Send + Sync {
    /// Resolve a series from a name fragment.
    ///
    /// Matching is a case-insensitive substring match. An exact name match
    /// wins; several substring matches without an exact one are ambiguous.
    fn resolve(&self, fragment: &str) -> Result<Series, CatalogError>;

    /// Get a series by its exact name.
    fn get(&self, name: &str) -> Result<Series, CatalogError>;

    /// List every known series, ordered by name.
    fn list(&self) -> Result<Vec<Series>, CatalogError>;

    /// Highest episode number observed for a series (0 if none).
    fn max_known_episode(&self, name: &str) -> Result<u32, CatalogError>;

    /// Store or update series metadata.
    ///
    /// Returns the number of series that were not known before.
    fn store_series(&self, series: &[Series]) -> Result<u32, CatalogError>;

    /// Record observed episodes.
    ///
    /// Episodes are deduplicated by `(series_name, download)`; episodes of
    /// unknown series are skipped. Returns the number of new episodes.
    fn store_episodes(&self, episodes: &[Episode]) -> Result<u32, CatalogError>;

    /// Get catalog statistics.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
