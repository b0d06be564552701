//! CLI error types

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input or output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command failed; the message carries the underlying error.
    #[error("{0}")]
    Command(String),
}

impl CliError {
    /// Wraps an engine error for display.
    pub fn command(message: impl Into<String>) -> Self {
        CliError::Command(message.into())
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
