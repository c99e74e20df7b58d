//! Command-level errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::download::DownloadError;
use crate::episode::SourceError;
use crate::filter::FilterError;
use crate::script::ScriptError;
use crate::subscription::StoreError;

/// Kind of a command failure. Callers match on this instead of on the
/// underlying error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Validation,
    Transport,
    Storage,
}

impl ErrorKind {
    /// Domain outcomes are always reported as structured results.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound | ErrorKind::AlreadyExists | ErrorKind::Validation
        )
    }
}

/// Errors returned by subscription commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::NotFound(_) => ErrorKind::NotFound,
            CommandError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CommandError::Validation(_) => ErrorKind::Validation,
            CommandError::Transport(_) => ErrorKind::Transport,
            CommandError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<CatalogError> for CommandError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) | CatalogError::Ambiguous { .. } => {
                CommandError::NotFound(err.to_string())
            }
            CatalogError::Database(_) | CatalogError::Internal(_) => {
                CommandError::Storage(err.to_string())
            }
        }
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        CommandError::Storage(err.to_string())
    }
}

impl From<ScriptError> for CommandError {
    fn from(err: ScriptError) -> Self {
        CommandError::Storage(err.to_string())
    }
}

impl From<DownloadError> for CommandError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::NotFound(_) => CommandError::NotFound(err.to_string()),
            DownloadError::InvalidTransition { .. } => CommandError::Validation(err.to_string()),
            DownloadError::Database(_) => CommandError::Storage(err.to_string()),
        }
    }
}

impl From<SourceError> for CommandError {
    fn from(err: SourceError) -> Self {
        if err.is_transport() {
            CommandError::Transport(err.to_string())
        } else {
            CommandError::Storage(err.to_string())
        }
    }
}

impl From<FilterError> for CommandError {
    fn from(err: FilterError) -> Self {
        CommandError::Validation(err.to_string())
    }
}
