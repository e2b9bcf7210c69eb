//! SQL*Loader log scraping
//!
//! The loader summary looks different per platform. UNIX builds print
//!
//! ```text
//! Total logical records skipped:          0
//! Total logical records read:         73205
//! Total logical records rejected:         1
//! Total logical records discarded:        0
//! ```
//!
//! while Windows builds print
//!
//! ```text
//!    0 Rows successfully loaded.
//! 1000 Rows not loaded due to data errors.
//!    0 Rows not loaded because all WHEN clauses were failed.
//! ```
//!
//! Error lines look like `SQL*Loader-466: Column CALL_ID does not exist in
//! table VQS_LOADTABLE_2.` or `ORA-04043: object T_REF does not exist`.
//!
//! Each line is tried against the patterns in order and the first match
//! wins. Different lines may fill different fields; a later line overwrites
//! the value an earlier line set for the same field.

use crate::error::Result;
use regex::Regex;
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use tracing::warn;

const LOADER_ERROR: &str = "err_loader";
const DB_ERROR: &str = "err_db";
const NUM_LOADED: &str = "num_loaded";
const NUM_ERRORS: &str = "num_errors";

/// Ordered line patterns, each with one named group
const PATTERNS: &[&str] = &[
    r"^(?P<err_loader>SQL\*Loader-\d+: .+)",
    r"^(?P<err_db>ORA-\d+: .+)",
    r"^Total logical records read:\s*(?P<num_loaded>\d+)",
    r"^Total logical records rejected:\s*(?P<num_errors>\d+)",
    r"^\s*(?P<num_loaded>\d+)\s+Rows successfully loaded\.",
    r"^\s*(?P<num_errors>\d+)\s+Rows not loaded due to data errors\.",
];

/// What a loader log says about one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    /// Rows read (UNIX) or successfully loaded (Windows)
    pub num_loaded: u64,
    /// Rows rejected because of data errors
    pub num_errors: u64,
    /// Last `SQL*Loader-NNN:` line
    pub loader_error: Option<String>,
    /// Last `ORA-NNNNN:` line
    pub db_error: Option<String>,
}

impl LogSummary {
    fn merge(&mut self, field: &str, value: &str) {
        match field {
            LOADER_ERROR => self.loader_error = Some(value.to_string()),
            DB_ERROR => self.db_error = Some(value.to_string()),
            NUM_LOADED | NUM_ERRORS => match value.parse::<u64>() {
                Ok(n) if field == NUM_LOADED => self.num_loaded = n,
                Ok(n) => self.num_errors = n,
                Err(e) => warn!(field, value, error = %e, "Ignoring unparseable count in loader log"),
            },
            _ => {}
        }
    }
}

/// Compiled log patterns
#[derive(Debug, Clone)]
pub struct LogParser {
    patterns: Vec<Regex>,
}

impl LogParser {
    pub fn new() -> Result<Self> {
        let patterns = PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Feed one line; returns true when a pattern matched
    pub fn parse_line(&self, line: &str, summary: &mut LogSummary) -> bool {
        let line = line.trim_end();

        for pattern in &self.patterns {
            if let Some(captures) = pattern.captures(line) {
                for name in pattern.capture_names().flatten() {
                    if let Some(value) = captures.name(name) {
                        summary.merge(name, value.as_str());
                    }
                }
                return true;
            }
        }

        false
    }

    pub fn parse_str(&self, text: &str) -> LogSummary {
        let mut summary = LogSummary::default();
        for line in text.lines() {
            self.parse_line(line, &mut summary);
        }
        summary
    }

    /// Parse a log stream; non-UTF-8 bytes are replaced rather than rejected
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> std::io::Result<LogSummary> {
        let mut summary = LogSummary::default();
        for line in reader.split(b'\n') {
            let line = line?;
            self.parse_line(&String::from_utf8_lossy(&line), &mut summary);
        }
        Ok(summary)
    }

    /// Parse the log at `path`.
    ///
    /// Returns `None` when the file is missing or unreadable: the caller has
    /// no counts at all and must treat the load as failed.
    pub fn parse_file(&self, path: &Path) -> Option<LogSummary> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), "problem opening sqlldr log: {}", e);
                return None;
            }
        };

        match self.parse_reader(std::io::BufReader::new(file)) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(path = %path.display(), "problem reading sqlldr log: {}", e);
                None
            }
        }
    }
}
