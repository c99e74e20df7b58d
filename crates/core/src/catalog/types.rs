//! Types for the series catalog.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A followable episodic series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Series name (also its identifier).
    pub name: String,
    /// Subtitle groups known to release this series.
    #[serde(default)]
    pub subtitle_groups: Vec<SubtitleGroup>,
    /// Day of the week new episodes air.
    pub update_day: Weekday,
}

impl Series {
    /// Find one of this series' subtitle groups by id or name
    /// (case-insensitive).
    pub fn find_group(&self, key: &str) -> Option<&SubtitleGroup> {
        self.subtitle_groups
            .iter()
            .find(|g| g.id.eq_ignore_ascii_case(key) || g.name.eq_ignore_ascii_case(key))
    }

    /// Look up a group by its exact id.
    pub fn group_by_id(&self, id: &str) -> Option<&SubtitleGroup> {
        self.subtitle_groups.iter().find(|g| g.id == id)
    }
}

/// A subtitle (fansub) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleGroup {
    pub id: String,
    pub name: String,
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Total known series.
    pub total_series: u64,
    /// Total observed episodes.
    pub total_episodes: u64,
    /// Total known subtitle groups.
    pub total_subtitle_groups: u64,
    /// Most recently observed episode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_episode_at: Option<DateTime<Utc>>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Series not found: {0}")]
    NotFound(String),

    #[error("Series name '{fragment}' is ambiguous: {}", .matches.join(", "))]
    Ambiguous {
        fragment: String,
        matches: Vec<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
