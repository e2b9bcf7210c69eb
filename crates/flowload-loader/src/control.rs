//! SQL*Loader control file generation
//!
//! A control file for `n` input files looks like:
//!
//! ```text
//! OPTIONS (SKIP=1)
//! LOAD DATA
//! INFILE "/data/xdr_001"
//! INFILE "/data/xdr_002"
//! INTO TABLE VQS_LOADTABLE_TDM TRUNCATE
//! FIELDS TERMINATED BY '|'
//! TRAILING NULLCOLS
//! (call_id, dt_start TIMESTAMP "yyyy-mm-dd+hh24:mi:ss.ff3", report_date "to_date(:report_date, 'YYYY/MM/DD HH24:MI:SS')")
//! ```
//!
//! The field clause maps input columns to table columns by position, so the
//! field order is written exactly as configured. Nothing checks it against
//! the table definition.

use crate::job::LoadJob;
use flowload_common::LoadError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Fields starting with this prefix are parsed as timestamps
pub const DEFAULT_TIMESTAMP_PREFIX: &str = "dt_";

pub const DEFAULT_TIMESTAMP_MASK: &str = "yyyy-mm-dd+hh24:mi:ss.ff3";

/// Fields (case-insensitive) converted with `to_date`
pub const DEFAULT_DATE_FIELDS: &[&str] = &["report_date", "creation_time"];

pub const DEFAULT_DATE_MASK: &str = "YYYY/MM/DD HH24:MI:SS";

/// Per-field type coercion rules for the field clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldRules {
    pub timestamp_prefix: String,
    pub timestamp_mask: String,
    pub date_fields: Vec<String>,
    pub date_mask: String,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            timestamp_prefix: DEFAULT_TIMESTAMP_PREFIX.to_string(),
            timestamp_mask: DEFAULT_TIMESTAMP_MASK.to_string(),
            date_fields: DEFAULT_DATE_FIELDS.iter().map(|f| f.to_string()).collect(),
            date_mask: DEFAULT_DATE_MASK.to_string(),
        }
    }
}

impl FieldRules {
    /// Render one entry of the field clause
    pub fn render_field(&self, name: &str) -> String {
        if !self.timestamp_prefix.is_empty() && name.starts_with(&self.timestamp_prefix) {
            format!("{} TIMESTAMP \"{}\"", name, self.timestamp_mask)
        } else if self.is_date_field(name) {
            format!("{} \"to_date(:{}, '{}')\"", name, name, self.date_mask)
        } else {
            name.to_string()
        }
    }

    /// `(f1, f2, ...)` in the given order
    pub fn render_field_clause(&self, names: &[String]) -> String {
        let rendered: Vec<String> = names.iter().map(|n| self.render_field(n)).collect();
        format!("({})", rendered.join(", "))
    }

    fn is_date_field(&self, name: &str) -> bool {
        self.date_fields.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

/// Quote a delimiter for `FIELDS TERMINATED BY`.
///
/// Quotes and control characters cannot be written literally, so they use
/// the hex form, e.g. a tab becomes `X'09'`.
pub fn render_delimiter(delimiter: char) -> String {
    if delimiter == '\'' || delimiter.is_control() {
        let mut buf = [0u8; 4];
        let hex: String = delimiter
            .encode_utf8(&mut buf)
            .bytes()
            .map(|b| format!("{:02X}", b))
            .collect();
        format!("X'{}'", hex)
    } else {
        format!("'{}'", delimiter)
    }
}

/// Build the full control file text for a job
pub fn render_control_file(job: &LoadJob, rules: &FieldRules) -> String {
    let mut ctl = String::new();

    // Input files carry a header line
    ctl.push_str("OPTIONS (SKIP=1)\n");
    ctl.push_str("LOAD DATA\n");

    for file in job.files() {
        let _ = writeln!(ctl, "INFILE \"{}\"", file.display());
    }

    let _ = writeln!(ctl, "INTO TABLE {} TRUNCATE", job.loadtable());
    let _ = writeln!(ctl, "FIELDS TERMINATED BY {}", render_delimiter(job.delimiter()));
    ctl.push_str("TRAILING NULLCOLS\n");
    ctl.push_str(&rules.render_field_clause(job.field_names()));
    ctl.push('\n');

    ctl
}

/// Write the control file for `job` to `path`
pub fn write_control_file(job: &LoadJob, rules: &FieldRules, path: &Path) -> Result<(), LoadError> {
    std::fs::write(path, render_control_file(job, rules)).map_err(|e| {
        LoadError::critical(
            job.suffix(),
            format!(
                "{}: Cannot write ctl file \"{}\": {}",
                job.suffix(),
                path.display(),
                e
            ),
        )
    })?;

    tracing::debug!(flow = %job.suffix(), path = %path.display(), "Wrote control file");
    Ok(())
}
