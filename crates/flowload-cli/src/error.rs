//! Error types for the flowload CLI
//!
//! Everything that stops a run before or between load cycles. Failed load
//! cycles themselves are [`flowload_common::LoadError`]s and never end up here.

use flowload_loader::LoaderError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Required file is missing
    #[error("File not found: '{0}'. Verify the path passed with --config exists.")]
    FileNotFound(String),

    /// Configuration content is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing failed
    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Too many live instances hold the pid file
    #[error("Already running: pid(s) {pids} listed in '{path}'. Set devmode = true in [global] to force a run.")]
    AlreadyRunning { path: String, pids: String },

    /// Loader inputs could not be built
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize run report: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
