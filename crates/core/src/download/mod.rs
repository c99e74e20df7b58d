//! Download queue handed to an external downloader.

mod queue;
mod sqlite;
mod types;

pub use queue::{DownloadError, Downloader};
pub use sqlite::SqliteDownloadQueue;
pub use types::{DownloadStatus, DownloadTask};
