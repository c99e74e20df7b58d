//! Types for observed episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observed release of an episode.
///
/// Several instances may share the same `(series_name, episode)` pair, for
/// example releases of the same episode by different subtitle groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Series this episode belongs to.
    pub series_name: String,
    /// Episode number.
    pub episode: u32,
    /// Release title as published.
    pub title: String,
    /// Subtitle group id that published this release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_group: Option<String>,
    /// Download link (magnet URI or torrent URL).
    pub download: String,
    /// When the release was observed.
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

/// Query for searching episodes outside of any subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSearch {
    /// Free-text keyword, or a series name when `tag` is set.
    pub keyword: String,
    /// Search by series tag instead of release title.
    #[serde(default)]
    pub tag: bool,
    /// Comma-separated subtitle group names (tag search only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Maximum number of pages to read.
    pub max_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_serialization_skips_missing_group() {
        let episode = Episode {
            series_name: "Show A".to_string(),
            episode: 4,
            title: "[Group] Show A - 04".to_string(),
            subtitle_group: None,
            download: "magnet:?xt=urn:btih:abc".to_string(),
            observed_at: Utc::now(),
        };

        let json = serde_json::to_string(&episode).unwrap();
        assert!(!json.contains("subtitle_group"));

        let parsed: Episode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, episode);
    }

    #[test]
    fn test_episode_search_minimal() {
        let json = r#"{"keyword": "show", "max_pages": 2}"#;
        let search: EpisodeSearch = serde_json::from_str(json).unwrap();
        assert_eq!(search.keyword, "show");
        assert!(!search.tag);
        assert!(search.subtitle.is_none());
    }
}
