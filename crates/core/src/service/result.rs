//! Structured command results.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CommandError, ErrorKind};

/// Outcome tag of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Warning,
    Error,
}

/// Result returned by every subscription command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status: ResultStatus,
    /// Human-readable message.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Set on errors and on warnings caused by a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
            data: None,
            error_kind: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Warning,
            message: message.into(),
            data: None,
            error_kind: None,
        }
    }

    /// Structured form of a command failure.
    ///
    /// `AlreadyExists` is reported as a warning, everything else as an error.
    pub fn from_error(err: &CommandError) -> Self {
        let status = match err.kind() {
            ErrorKind::AlreadyExists => ResultStatus::Warning,
            _ => ResultStatus::Error,
        };
        Self {
            status,
            message: err.to_string(),
            data: None,
            error_kind: Some(err.kind()),
        }
    }

    /// Attach a data payload.
    ///
    /// A payload that cannot be represented as JSON is logged and left out;
    /// the outcome of the command itself stands.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => self.data = Some(value),
            Err(e) => {
                warn!("Dropping payload of '{}': {}", self.message, e);
                self.data = None;
            }
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Error
    }
}
