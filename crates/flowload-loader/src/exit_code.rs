//! Loader exit code interpretation
//!
//! SQL*Loader reports its outcome through the process exit code, and the
//! numbering differs between UNIX and Windows builds:
//!
//! | Code | UNIX    | Windows |
//! |------|---------|---------|
//! | 0    | SUCCESS | SUCCESS |
//! | 1    | FAIL    | -       |
//! | 2    | WARN    | WARN    |
//! | 3    | FATAL   | FAIL    |
//! | 4    | -       | FATAL   |

use serde::Serialize;
use std::process::ExitStatus;

/// Classified meaning of a loader exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExitSymbol {
    Success,
    Warn,
    Fail,
    Fatal,
    Unknown(i32),
}

impl ExitSymbol {
    /// What the loader means by this code
    pub fn description(&self) -> &'static str {
        match self {
            ExitSymbol::Success => "All rows loaded successfully",
            ExitSymbol::Warn => "All or some rows rejected/discarded, or discontinued load",
            ExitSymbol::Fail => {
                "Command-line or syntax errors, or Oracle errors nonrecoverable for SQL*Loader"
            }
            ExitSymbol::Fatal => "Operating system errors (such as file open/close and malloc)",
            ExitSymbol::Unknown(_) => "Unrecognized exit code",
        }
    }
}

impl std::fmt::Display for ExitSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitSymbol::Success => write!(f, "SUCCESS"),
            ExitSymbol::Warn => write!(f, "WARN"),
            ExitSymbol::Fail => write!(f, "FAIL"),
            ExitSymbol::Fatal => write!(f, "FATAL"),
            ExitSymbol::Unknown(code) => write!(f, "Unknown ({})", code),
        }
    }
}

/// Platform-specific exit code numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCodeTable {
    #[default]
    Posix,
    Windows,
}

impl ExitCodeTable {
    /// Table matching the platform this binary was built for
    pub fn native() -> Self {
        if cfg!(windows) {
            ExitCodeTable::Windows
        } else {
            ExitCodeTable::Posix
        }
    }

    pub fn classify(self, code: i32) -> ExitSymbol {
        match (self, code) {
            (_, 0) => ExitSymbol::Success,
            (ExitCodeTable::Posix, 1) => ExitSymbol::Fail,
            (ExitCodeTable::Posix, 2) => ExitSymbol::Warn,
            (ExitCodeTable::Posix, 3) => ExitSymbol::Fatal,
            (ExitCodeTable::Windows, 2) => ExitSymbol::Warn,
            (ExitCodeTable::Windows, 3) => ExitSymbol::Fail,
            (ExitCodeTable::Windows, 4) => ExitSymbol::Fatal,
            (_, other) => ExitSymbol::Unknown(other),
        }
    }

    /// Extract the exit code from a raw `wait()` status word
    pub fn decode_wait_status(raw: i32) -> i32 {
        (raw >> 8) & 0xff
    }
}

/// Exit code of a finished process.
///
/// A process killed by a signal has no exit code; it is reported as the
/// negated signal number so it always lands on `Unknown`.
pub fn exit_code(status: &ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => code_without_exit(status),
    }
}

#[cfg(unix)]
fn code_without_exit(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => -signal,
        None => ExitCodeTable::decode_wait_status(status.into_raw()),
    }
}

#[cfg(not(unix))]
fn code_without_exit(_status: &ExitStatus) -> i32 {
    -1
}
