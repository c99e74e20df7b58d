//! Testing utilities and mock implementations.
//!
//! Provides a mock episode source and fixtures so refresh cycles and the
//! HTTP API can be exercised without a real metadata backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use tsuiseki_core::testing::{fixtures, MockEpisodeSource};
//!
//! let source = MockEpisodeSource::new();
//! source.set_episodes("Show A", fixtures::episodes("Show A", 1..=4, "g1")).await;
//! ```

mod mock_episode_source;

pub use mock_episode_source::{MockEpisodeSource, RecordedFetch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::ops::RangeInclusive;

    use chrono::{Utc, Weekday};

    use crate::catalog::{Series, SubtitleGroup};
    use crate::episode::Episode;

    /// Create a test series airing on Saturday with the given group ids.
    ///
    /// Group names are the ids upper-cased.
    pub fn series(name: &str, group_ids: &[&str]) -> Series {
        Series {
            name: name.to_string(),
            subtitle_groups: group_ids
                .iter()
                .map(|id| SubtitleGroup {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                })
                .collect(),
            update_day: Weekday::Sat,
        }
    }

    /// Create a test episode released by a subtitle group.
    pub fn episode(series_name: &str, number: u32, group: &str) -> Episode {
        Episode {
            series_name: series_name.to_string(),
            episode: number,
            title: format!("[{}] {} - {:02} [1080p]", group, series_name, number),
            subtitle_group: Some(group.to_string()),
            download: format!(
                "magnet:?xt=urn:btih:{}-{}-{}",
                series_name.to_lowercase().replace(' ', "-"),
                number,
                group
            ),
            observed_at: Utc::now(),
        }
    }

    /// Create one episode per number in a range.
    pub fn episodes(series_name: &str, numbers: RangeInclusive<u32>, group: &str) -> Vec<Episode> {
        numbers.map(|n| episode(series_name, n, group)).collect()
    }
}
