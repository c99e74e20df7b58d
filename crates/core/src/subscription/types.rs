//! Subscription types and state transitions.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Status of a subscription.
///
/// The numeric codes are the ones accepted by status changes and stored in
/// the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// No longer tracked. The record is kept so the series can be re-added.
    Deleted,
    /// Caught up, watching for the next episode.
    Followed,
    /// New episodes surfaced since the user last acknowledged.
    Updated,
}

impl SubscriptionStatus {
    /// Numeric code for this status.
    pub fn code(&self) -> i64 {
        match self {
            SubscriptionStatus::Deleted => 0,
            SubscriptionStatus::Followed => 1,
            SubscriptionStatus::Updated => 2,
        }
    }

    /// Status for a declared numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SubscriptionStatus::Deleted),
            1 => Some(SubscriptionStatus::Followed),
            2 => Some(SubscriptionStatus::Updated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Deleted => "deleted",
            SubscriptionStatus::Followed => "followed",
            SubscriptionStatus::Updated => "updated",
        }
    }

    /// Returns true if subscriptions in this status take part in refresh cycles.
    pub fn is_active(&self) -> bool {
        !matches!(self, SubscriptionStatus::Deleted)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deleted" => Ok(SubscriptionStatus::Deleted),
            "followed" => Ok(SubscriptionStatus::Followed),
            "updated" => Ok(SubscriptionStatus::Updated),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}

/// Per-subscription episode filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilters {
    /// Allowed subtitle group ids. Empty means no restriction.
    #[serde(default)]
    pub subtitle_groups: Vec<String>,
    /// Titles must contain at least one of these.
    #[serde(default)]
    pub include: Vec<String>,
    /// Titles must contain none of these.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Titles must match this pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl SubscriptionFilters {
    pub fn is_empty(&self) -> bool {
        self.subtitle_groups.is_empty()
            && self.include.is_empty()
            && self.exclude.is_empty()
            && self.regex.is_none()
    }
}

/// A user's follow record for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Name of the followed series.
    pub series_name: String,
    pub status: SubscriptionStatus,
    /// Highest episode number considered caught up.
    pub watermark: u32,
    /// Time of the last transition into `Updated`.
    pub updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filters: SubscriptionFilters,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Subscription {
    /// Create a new followed subscription.
    pub fn new(series_name: impl Into<String>, watermark: u32, now: DateTime<Utc>) -> Self {
        Self {
            series_name: series_name.into(),
            status: SubscriptionStatus::Followed,
            watermark,
            updated_time: None,
            filters: SubscriptionFilters::default(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Bring a deleted subscription back to `Followed`, keeping its filters.
    pub fn refollow(&mut self, watermark: u32, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Followed;
        self.watermark = watermark;
        self.modified_at = now;
    }

    /// Soft-delete this subscription.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Deleted;
        self.modified_at = now;
    }

    /// Force the watermark without touching the status.
    pub fn mark(&mut self, episode: u32, now: DateTime<Utc>) {
        self.watermark = episode;
        self.modified_at = now;
    }

    /// Set the status unconditionally.
    pub fn set_status(&mut self, status: SubscriptionStatus, now: DateTime<Utc>) {
        if status == SubscriptionStatus::Updated && self.status != SubscriptionStatus::Updated {
            self.updated_time = Some(now);
        }
        self.status = status;
        self.modified_at = now;
    }

    /// Advance to a new watermark after new episodes surfaced.
    pub fn advance(&mut self, watermark: u32, now: DateTime<Utc>) {
        self.watermark = watermark;
        self.status = SubscriptionStatus::Updated;
        self.updated_time = Some(now);
        self.modified_at = now;
    }

    /// Revert `Updated` to `Followed` once `updated_time` is older than `window`.
    ///
    /// Returns true if the subscription changed.
    pub fn expire_if_stale(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.status != SubscriptionStatus::Updated {
            return false;
        }
        let stale = match self.updated_time {
            Some(updated) => now - updated > window,
            None => true,
        };
        if stale {
            self.status = SubscriptionStatus::Followed;
            self.modified_at = now;
        }
        stale
    }
}
