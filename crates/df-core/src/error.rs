//! Error types for df-core

use thiserror::Error;

/// Main error type for df-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is a local, recoverable domain condition
    /// (as opposed to a storage or configuration failure)
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::UserNotFound(_) | Error::ReminderNotFound(_) | Error::InvalidInput(_)
        )
    }
}

/// Result type alias for df-core
pub type Result<T> = std::result::Result<T, Error>;
