//! Download task types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::episode::Episode;

/// State of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Queued,
    InProgress,
    Failed,
    Done,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Queued => "queued",
            DownloadStatus::InProgress => "in_progress",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Done => "done",
        }
    }

    /// Returns true if the download worker is finished with this task.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Failed | DownloadStatus::Done)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DownloadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DownloadStatus::Queued),
            "in_progress" => Ok(DownloadStatus::InProgress),
            "failed" => Ok(DownloadStatus::Failed),
            "done" => Ok(DownloadStatus::Done),
            other => Err(format!("unknown download status: {}", other)),
        }
    }
}

/// A single episode download instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Unique task id (UUID v4).
    pub id: String,
    pub series_name: String,
    pub episode: u32,
    pub title: String,
    /// Download link.
    pub download: String,
    pub status: DownloadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadTask {
    /// Create a queued task.
    pub fn new(
        series_name: &str,
        episode: u32,
        title: impl Into<String>,
        download: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            series_name: series_name.to_string(),
            episode,
            title: title.into(),
            download: download.to_string(),
            status: DownloadStatus::Queued,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a queued task for an observed episode.
    pub fn from_episode(episode: &Episode, now: DateTime<Utc>) -> Self {
        Self::new(
            &episode.series_name,
            episode.episode,
            episode.title.clone(),
            &episode.download,
            now,
        )
    }
}
