//! Script-driven series.
//!
//! Some series are tracked by user scripts rather than subscriptions. They
//! keep their own episode counter and status, which `mark`, refresh cycles
//! and the staleness sweep act on, and they show up on the calendar.

mod memory;
mod sqlite;
mod types;

use thiserror::Error;

pub use memory::InMemoryScriptRegistry;
pub use sqlite::SqliteScriptRegistry;
pub use types::ScriptedSeries;

/// Errors for script registry operations.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt script record for {name}: {reason}")]
    Corrupt { name: String, reason: String },
}

/// Registry of scripted series.
pub trait ScriptRegistry: Send + Sync {
    /// Get a scripted series by exact name.
    fn get(&self, name: &str) -> Result<Option<ScriptedSeries>, ScriptError>;

    /// Insert or replace a scripted series.
    fn save(&self, series: &ScriptedSeries) -> Result<(), ScriptError>;

    /// List every scripted series, ordered by name.
    fn list(&self) -> Result<Vec<ScriptedSeries>, ScriptError>;
}
