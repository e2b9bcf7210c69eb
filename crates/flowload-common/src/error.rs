//! Error types for flowload

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for load operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// How bad a failed load is for the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Partial load within the error tolerance; the run can go on
    Warning,
    /// The flow could not be loaded
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of a load cycle that did not end cleanly.
///
/// The message is the full operator-facing summary, already prefixed with the
/// flow name. Constructing an error has no side effect: callers decide when
/// to log it, usually through [`LoadError::log`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Control file, invocation, log or discard-count failure
    #[error("{message}")]
    Critical { flow: String, message: String },

    /// Rows were rejected, but no more than the configured ceiling
    #[error("{message}")]
    Warning { flow: String, message: String },
}

impl LoadError {
    /// Create a critical (non-recoverable) load error
    pub fn critical(flow: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Critical {
            flow: flow.into(),
            message: message.into(),
        }
    }

    /// Create a warning-level (recoverable) load error
    pub fn warning(flow: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warning {
            flow: flow.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            LoadError::Critical { .. } => Severity::Critical,
            LoadError::Warning { .. } => Severity::Warning,
        }
    }

    /// True for partial loads the orchestrator may swallow
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn flow(&self) -> &str {
        match self {
            LoadError::Critical { flow, .. } | LoadError::Warning { flow, .. } => flow,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LoadError::Critical { message, .. } | LoadError::Warning { message, .. } => message,
        }
    }

    /// Emit the error at its own severity
    pub fn log(&self) {
        match self.severity() {
            Severity::Critical => tracing::error!(flow = %self.flow(), "{}", self.message()),
            Severity::Warning => tracing::warn!(flow = %self.flow(), "{}", self.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_and_recoverability() {
        let warn = LoadError::warning("cdr", "cdr: partial load, discarded: 3");
        assert_eq!(warn.severity(), Severity::Warning);
        assert!(warn.is_recoverable());

        let crit = LoadError::critical("cdr", "cdr: load failed: FATAL");
        assert_eq!(crit.severity(), Severity::Critical);
        assert!(!crit.is_recoverable());
    }

    #[test]
    fn test_display_is_the_message() {
        let err = LoadError::critical("xdr", "xdr: Cannot write ctl file");
        assert_eq!(err.to_string(), "xdr: Cannot write ctl file");
        assert_eq!(err.flow(), "xdr");
        assert_eq!(err.message(), "xdr: Cannot write ctl file");
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }
}
