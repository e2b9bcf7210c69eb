//! Construction-time errors for loader types
//!
//! Failures of a load cycle itself are reported as
//! [`flowload_common::LoadError`]; this module covers invalid inputs caught
//! before a cycle starts.

use thiserror::Error;

/// Result type alias for building loader inputs
pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Invalid database '{name}': {reason}")]
    InvalidDatabase { name: String, reason: String },

    #[error("Invalid load job '{suffix}': {reason}")]
    InvalidJob { suffix: String, reason: String },

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl LoaderError {
    pub fn invalid_database(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDatabase {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_job(suffix: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidJob {
            suffix: suffix.into(),
            reason: reason.into(),
        }
    }
}
