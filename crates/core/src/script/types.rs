//! Scripted series types.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::download::DownloadTask;
use crate::subscription::SubscriptionStatus;

/// A series driven by a user script.
///
/// The script publishes download links per episode number. Refresh cycles
/// queue every published episode above `episode` and advance the counter,
/// the same way reconciliation advances a subscription's watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedSeries {
    pub name: String,
    /// Highest episode the script considers caught up.
    pub episode: u32,
    pub status: SubscriptionStatus,
    pub updated_time: Option<DateTime<Utc>>,
    pub update_day: Weekday,
    /// Download links published by the script, keyed by episode number.
    #[serde(default)]
    pub releases: BTreeMap<u32, String>,
}

impl ScriptedSeries {
    pub fn new(name: impl Into<String>, episode: u32, update_day: Weekday) -> Self {
        Self {
            name: name.into(),
            episode,
            status: SubscriptionStatus::Followed,
            updated_time: None,
            update_day,
            releases: BTreeMap::new(),
        }
    }

    /// Add a published release, replacing any earlier link for the episode.
    pub fn with_release(mut self, episode: u32, download: impl Into<String>) -> Self {
        self.releases.insert(episode, download.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status != SubscriptionStatus::Deleted
    }

    /// Download tasks for published episodes above the counter, ascending.
    pub fn pending(&self, now: DateTime<Utc>) -> Vec<DownloadTask> {
        self.releases
            .range(self.episode.saturating_add(1)..)
            .map(|(&episode, download)| {
                DownloadTask::new(
                    &self.name,
                    episode,
                    format!("{} - {:02}", self.name, episode),
                    download,
                    now,
                )
            })
            .collect()
    }

    /// Move the counter to `episode` and mark the series updated.
    pub fn advance(&mut self, episode: u32, now: DateTime<Utc>) {
        self.episode = episode;
        self.status = SubscriptionStatus::Updated;
        self.updated_time = Some(now);
    }

    /// Revert `Updated` to `Followed` once older than `window`.
    pub fn expire_if_stale(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.status != SubscriptionStatus::Updated {
            return false;
        }
        let stale = self.updated_time.is_none_or(|t| now - t > window);
        if stale {
            self.status = SubscriptionStatus::Followed;
        }
        stale
    }
}
