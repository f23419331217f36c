//! Error types for readrec-core
//!
//! Only fatal input problems live here. Source failures and topic inference
//! failures are downgraded to warnings before they reach the pipeline result.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for readrec operations
pub type Result<T> = std::result::Result<T, RecError>;

/// Errors that abort a recommendation run before any output is produced
#[derive(Error, Debug)]
pub enum RecError {
    /// The history database does not exist
    #[error("History DB not found: {}", .0.display())]
    HistoryNotFound(PathBuf),

    /// The history database exists but could not be copied or queried
    #[error("History DB unreadable ({}): {message}", .path.display())]
    HistoryUnreadable { path: PathBuf, message: String },

    /// `since` was not a YYYY-MM-DD date
    #[error("Invalid --since format. Use YYYY-MM-DD (got {0:?}).")]
    InvalidSince(String),

    /// The user-supplied exclusion pattern is not a valid regex
    #[error("Invalid exclude pattern regex: {0}")]
    InvalidPattern(String),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RecError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        RecError::HistoryUnreadable {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
