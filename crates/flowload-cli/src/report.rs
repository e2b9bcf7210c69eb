//! Run report
//!
//! One [`FlowOutcome`] per active flow, in processing order. Written as JSON
//! with `--report`.

use crate::error::Result;
use chrono::{DateTime, Utc};
use flowload_common::{LoadError, Severity};
use flowload_loader::LoadReport;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    /// Loader reported success
    Loaded,
    /// Rows were rejected, within tolerance
    Partial,
    Failed,
    /// No input files
    Skipped,
    /// Dry run: files found and control file written, loader not started
    Prepared,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowOutcome {
    pub flow: String,
    pub status: FlowStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_loaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_errors: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
}

impl FlowOutcome {
    fn new(flow: &str, status: FlowStatus, message: impl Into<String>) -> Self {
        Self {
            flow: flow.to_string(),
            status,
            message: message.into(),
            num_files: None,
            num_loaded: None,
            num_errors: None,
            elapsed_secs: None,
        }
    }

    pub fn loaded(report: &LoadReport, num_files: usize) -> Self {
        Self {
            num_files: Some(num_files),
            num_loaded: Some(report.num_loaded),
            num_errors: Some(report.num_errors),
            elapsed_secs: Some(report.elapsed.as_secs_f64()),
            ..Self::new(&report.flow, FlowStatus::Loaded, report.message())
        }
    }

    pub fn from_error(err: &LoadError) -> Self {
        let status = match err.severity() {
            Severity::Warning => FlowStatus::Partial,
            Severity::Critical => FlowStatus::Failed,
        };
        Self::new(err.flow(), status, err.message())
    }

    pub fn skipped(flow: &str) -> Self {
        Self {
            num_files: Some(0),
            ..Self::new(flow, FlowStatus::Skipped, format!("{}: no files to load", flow))
        }
    }

    pub fn prepared(flow: &str, num_files: usize, command: impl std::fmt::Display) -> Self {
        Self {
            num_files: Some(num_files),
            ..Self::new(flow, FlowStatus::Prepared, format!("{}: would run {}", flow, command))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub flows: Vec<FlowOutcome>,
    /// Set when `stop_on_critical` ended the run early
    pub aborted: bool,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            flows: Vec::new(),
            aborted: false,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Any flow failed critically, or the run stopped early
    pub fn has_failures(&self) -> bool {
        self.aborted || self.flows.iter().any(|f| f.status == FlowStatus::Failed)
    }

    pub fn count(&self, status: FlowStatus) -> usize {
        self.flows.iter().filter(|f| f.status == status).count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
