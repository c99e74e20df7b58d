//! Episode-number bounds and deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::episode::Episode;

/// Inclusive episode-number bounds supplied by a search caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl EpisodeBounds {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, number: u32) -> bool {
        self.min.is_none_or(|min| number >= min) && self.max.is_none_or(|max| number <= max)
    }

    pub fn apply(&self, episodes: Vec<Episode>) -> Vec<Episode> {
        episodes
            .into_iter()
            .filter(|e| self.contains(e.episode))
            .collect()
    }
}

/// Keep the first-seen episode for each number, preserving order.
pub fn dedup_first(episodes: Vec<Episode>) -> Vec<Episode> {
    let mut seen = HashSet::new();
    episodes
        .into_iter()
        .filter(|e| seen.insert(e.episode))
        .collect()
}
