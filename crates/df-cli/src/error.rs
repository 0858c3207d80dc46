//! Error types for the dont-forget binary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] df_core::Error),

    #[error("Unknown command: {0}. Type /help for the list of commands.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No user to act as. Add [[users]] to dont-forget.toml or pass --user <id>.")]
    NoUser,
}

impl CliError {
    /// Whether retyping the command can fix it. Storage and configuration
    /// failures are not user errors.
    pub fn is_user_error(&self) -> bool {
        match self {
            CliError::Core(e) => e.is_domain(),
            CliError::NoUser => false,
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
