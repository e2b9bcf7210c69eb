//! One load cycle: control file, loader run, log check, outcome
//!
//! Outcome rules, given the exit symbol and the parsed log:
//!
//! | Log     | Exit       | Rejected rows      | Result                          |
//! |---------|------------|--------------------|---------------------------------|
//! | missing | any        | -                  | critical, "load failed"         |
//! | present | SUCCESS    | -                  | `Ok(LoadReport)`                |
//! | present | WARN       | <= max_error_count | warning, "partial load"         |
//! | present | WARN       | > max_error_count  | critical, "too many discards"   |
//! | present | FAIL/FATAL/unknown | -          | critical, "load failed" + errors |
//!
//! Every non-`Ok` result moves reject files and the loader log to the backup
//! directory before returning.

use crate::backup;
use crate::control::{write_control_file, FieldRules};
use crate::error::Result;
use crate::exit_code::{exit_code, ExitCodeTable, ExitSymbol};
use crate::job::LoadJob;
use crate::log_parser::{LogParser, LogSummary};
use flowload_common::LoadError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Record error ceiling passed to the binary, high enough that it never
/// stops early; rejected rows are judged against `max_error_count` instead.
pub const MAX_RECORD_ERRORS: u64 = 1_000_000;

/// Fixed loader settings shared by every cycle
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Path to the sqlldr executable
    pub sqlldr_bin: PathBuf,
    /// Where the loader writes `sqlldr.<flow>.log`
    pub log_dir: PathBuf,
    /// Where control files and `.bad` files live
    pub ctl_dir: PathBuf,
    /// Where logs and `.bad` files go after a non-clean load
    pub backup_dir: PathBuf,
    /// Rejected rows tolerated before a partial load becomes critical
    pub max_error_count: u64,
    pub exit_table: ExitCodeTable,
    pub field_rules: FieldRules,
}

impl LoaderConfig {
    pub fn new(
        sqlldr_bin: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        ctl_dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sqlldr_bin: sqlldr_bin.into(),
            log_dir: log_dir.into(),
            ctl_dir: ctl_dir.into(),
            backup_dir: backup_dir.into(),
            max_error_count: 0,
            exit_table: ExitCodeTable::native(),
            field_rules: FieldRules::default(),
        }
    }

    pub fn with_max_error_count(mut self, max_error_count: u64) -> Self {
        self.max_error_count = max_error_count;
        self
    }

    pub fn with_exit_table(mut self, exit_table: ExitCodeTable) -> Self {
        self.exit_table = exit_table;
        self
    }

    pub fn with_field_rules(mut self, field_rules: FieldRules) -> Self {
        self.field_rules = field_rules;
        self
    }
}

/// The loader command line for one job
#[derive(Debug, Clone)]
pub struct LoaderCommand {
    program: PathBuf,
    args: Vec<OsString>,
    redacted_connect: String,
}

impl LoaderCommand {
    /// Arguments, connect string first (with the password in clear)
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl std::fmt::Display for LoaderCommand {
    /// Command line with the password masked, safe for logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program.display(), self.redacted_connect)?;
        for arg in self.args.iter().skip(1) {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a clean load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub flow: String,
    pub table: String,
    pub num_loaded: u64,
    pub num_errors: u64,
    pub elapsed: Duration,
    pub exit: ExitSymbol,
}

impl LoadReport {
    /// Loaded rows per second, `None` when nothing was loaded
    pub fn rows_per_sec(&self) -> Option<f64> {
        rows_per_sec(self.num_loaded, self.elapsed)
    }

    pub fn message(&self) -> String {
        format!(
            "{}, load successful",
            base_message(&self.flow, &self.table, self.num_loaded, self.elapsed)
        )
    }
}

/// Runs load cycles against one set of directories
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
    parser: LogParser,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Result<Self> {
        Ok(Self {
            config,
            parser: LogParser::new()?,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Write the control file and build the command line, without running it
    pub fn prepare(&self, job: &LoadJob) -> std::result::Result<LoaderCommand, LoadError> {
        let ctl_file = job.ctl_file(&self.config.ctl_dir);
        write_control_file(job, &self.config.field_rules, &ctl_file)?;
        Ok(self.command(job, &ctl_file, &job.log_file(&self.config.log_dir)))
    }

    /// Run one full load cycle for `job`.
    ///
    /// Blocks until the loader binary exits. There is no timeout.
    pub fn load(&self, job: &LoadJob) -> std::result::Result<LoadReport, LoadError> {
        let command = self.prepare(job)?;
        let log_file = job.log_file(&self.config.log_dir);

        info!(
            flow = %job.suffix(),
            files = job.files().len(),
            table = %job.loadtable(),
            "Running {}",
            command
        );

        let started = Instant::now();
        let status = command.to_command().status().map_err(|e| {
            LoadError::critical(
                job.suffix(),
                format!(
                    "{}: cannot run loader \"{}\": {}",
                    job.suffix(),
                    self.config.sqlldr_bin.display(),
                    e
                ),
            )
        })?;
        let elapsed = started.elapsed();

        let code = exit_code(&status);
        let exit = self.config.exit_table.classify(code);
        info!(
            flow = %job.suffix(),
            "sqlldr return code: {} ({}: {})",
            code,
            exit,
            exit.description()
        );

        let outcome = match self.parser.parse_file(&log_file) {
            Some(summary) => classify(job, exit, &summary, elapsed, self.config.max_error_count),
            None => Err(LoadError::critical(
                job.suffix(),
                format!("{}: load failed: {}", job.suffix(), exit),
            )),
        };

        if outcome.is_err() {
            self.backup_output(job, &log_file);
        }

        outcome
    }

    fn command(&self, job: &LoadJob, ctl_file: &Path, log_file: &Path) -> LoaderCommand {
        let mut log_arg = OsString::from("log=");
        log_arg.push(log_file);
        let mut control_arg = OsString::from("control=");
        control_arg.push(ctl_file);

        LoaderCommand {
            program: self.config.sqlldr_bin.clone(),
            args: vec![
                job.database().connect_string().into(),
                "direct=false".into(),
                log_arg,
                control_arg,
                format!("errors={}", MAX_RECORD_ERRORS).into(),
                "silent=header".into(),
            ],
            redacted_connect: job.database().to_string(),
        }
    }

    /// Failures here are logged, never allowed to hide the load outcome
    fn backup_output(&self, job: &LoadJob, log_file: &Path) {
        let prefix = backup::timestamp_prefix();
        let outcome = backup::backup_artifacts(
            &self.config.ctl_dir,
            &self.config.backup_dir,
            log_file,
            &prefix,
        );

        if !outcome.moved.is_empty() {
            info!(
                flow = %job.suffix(),
                backup_dir = %self.config.backup_dir.display(),
                "Backed up {} loader file(s)",
                outcome.moved.len()
            );
        }

        if !outcome.is_complete() {
            warn!(
                flow = %job.suffix(),
                backup_dir = %self.config.backup_dir.display(),
                "Failed to back up {} loader file(s): {}",
                outcome.failed.len(),
                outcome.failure_summary()
            );
        }
    }
}

/// Decide the outcome of a run whose log could be parsed
pub fn classify(
    job: &LoadJob,
    exit: ExitSymbol,
    summary: &LogSummary,
    elapsed: Duration,
    max_error_count: u64,
) -> std::result::Result<LoadReport, LoadError> {
    let flow = job.suffix();
    let base = base_message(flow, job.loadtable(), summary.num_loaded, elapsed);

    match exit {
        ExitSymbol::Success => Ok(LoadReport {
            flow: flow.to_string(),
            table: job.loadtable().to_string(),
            num_loaded: summary.num_loaded,
            num_errors: summary.num_errors,
            elapsed,
            exit,
        }),
        ExitSymbol::Warn if summary.num_errors <= max_error_count => Err(LoadError::warning(
            flow,
            format!("{}, partial load, discarded: {}", base, summary.num_errors),
        )),
        ExitSymbol::Warn => Err(LoadError::critical(
            flow,
            format!("{}, partial load, too many discards: {}!", base, summary.num_errors),
        )),
        _ => {
            let mut message = format!("{}, load failed ({})", base, exit);
            for detail in [&summary.loader_error, &summary.db_error].into_iter().flatten() {
                message.push_str(", ");
                message.push_str(detail);
            }
            Err(LoadError::critical(flow, message))
        }
    }
}

fn rows_per_sec(num_loaded: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if num_loaded == 0 || secs <= 0.0 {
        None
    } else {
        Some(num_loaded as f64 / secs)
    }
}

/// `n/a` or the rate with one decimal
pub fn format_rows_per_sec(num_loaded: u64, elapsed: Duration) -> String {
    match rows_per_sec(num_loaded, elapsed) {
        Some(rate) => format!("{:.1}", rate),
        None => "n/a".to_string(),
    }
}

fn base_message(flow: &str, table: &str, num_loaded: u64, elapsed: Duration) -> String {
    format!(
        "{}: loaded {} rows in {:.3} sec ({} r/s) into {}",
        flow,
        num_loaded,
        elapsed.as_secs_f64(),
        format_rows_per_sec(num_loaded, elapsed),
        table
    )
}
