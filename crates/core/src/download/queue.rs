//! Downloader trait.

use thiserror::Error;

use super::{DownloadStatus, DownloadTask};

/// Errors for download queue operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Download task not found: {0}")]
    NotFound(String),

    #[error("Download task {id} is already {from}, cannot move to {to}")]
    InvalidTransition {
        id: String,
        from: DownloadStatus,
        to: DownloadStatus,
    },
}

/// Hand-off point between reconciliation and the external download worker.
///
/// Enqueueing is fire-and-forget; the worker reports terminal states back
/// through [`Downloader::set_status`] and later refresh cycles re-read them.
pub trait Downloader: Send + Sync {
    /// Enqueue tasks. Returns how many were newly queued or reset to queued.
    fn enqueue(&self, tasks: &[DownloadTask]) -> Result<usize, DownloadError>;

    /// Get a task by id.
    fn get(&self, id: &str) -> Result<Option<DownloadTask>, DownloadError>;

    /// List tasks, optionally restricted to one status.
    fn list(&self, status: Option<DownloadStatus>) -> Result<Vec<DownloadTask>, DownloadError>;

    /// Record a status reported by the download worker.
    ///
    /// A finished task only accepts another terminal status; moving it back
    /// to work is done by enqueueing it again or by
    /// [`Downloader::requeue_failed`].
    fn set_status(&self, id: &str, status: DownloadStatus) -> Result<DownloadTask, DownloadError>;

    /// Reset every failed task to queued and return them.
    fn requeue_failed(&self) -> Result<Vec<DownloadTask>, DownloadError>;
}
