//! Run orchestration
//!
//! One run takes the pid file, builds a single [`Loader`] and processes the
//! active flows strictly one after the other. A flow's [`LoadError`] is logged
//! and recorded; the run moves on to the next flow unless the error is
//! critical and `stop_on_critical` is set. Anything else (pid file, work
//! directories, unknown `--flow` names) aborts the run with a [`CliError`].

use crate::config::Config;
use crate::error::{CliError, Result};
use crate::flow::Flow;
use crate::pidfile::PidFile;
use crate::report::{FlowOutcome, FlowStatus, RunSummary};
use flowload_common::{LoadError, Severity};
use flowload_loader::Loader;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Write control files and report the command lines, without loading
    pub dry_run: bool,
    /// Restrict the run to these flows (processing order stays as configured)
    pub only_flows: Vec<String>,
}

/// Process every selected flow of `config` once
pub fn run(config: Config, options: &RunOptions) -> Result<RunSummary> {
    info!("Starting...");
    let mut summary = RunSummary::start();

    check_selection(&config, &options.only_flows)?;

    for dir in config.paths.work_dirs() {
        std::fs::create_dir_all(dir)?;
    }

    let pid_file = PidFile::acquire(
        &config.paths.pid_file,
        config.global.devmode,
        config.global.max_instances,
    )?;
    let loader = Loader::new(config.loader_config())?;
    debug!(config = ?loader.config(), "Loader ready");

    let stop_on_critical = config.global.stop_on_critical;
    let mut flows = config.flows;

    for flow in flows
        .iter_mut()
        .filter(|f| options.only_flows.is_empty() || options.only_flows.iter().any(|n| n == f.name()))
    {
        match process_flow(flow, &loader, options.dry_run) {
            Ok(outcome) => summary.flows.push(outcome),
            Err(err) => {
                err.log();
                summary.flows.push(FlowOutcome::from_error(&err));

                if stop_on_critical && err.severity() == Severity::Critical {
                    warn!(flow = %err.flow(), "Critical load error, stopping run");
                    summary.aborted = true;
                    break;
                }
                info!("Got load error, continuing with next flow (if any)");
            }
        }
    }

    drop(pid_file);
    summary.finish();

    info!(
        loaded = summary.count(FlowStatus::Loaded),
        partial = summary.count(FlowStatus::Partial),
        failed = summary.count(FlowStatus::Failed),
        skipped = summary.count(FlowStatus::Skipped),
        prepared = summary.count(FlowStatus::Prepared),
        "All Done!"
    );

    Ok(summary)
}

fn check_selection(config: &Config, only_flows: &[String]) -> Result<()> {
    let unknown: Vec<&str> = only_flows
        .iter()
        .filter(|name| !config.flows.iter().any(|f| f.name() == name.as_str()))
        .map(String::as_str)
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CliError::config(format!(
            "not an active flow: {}",
            unknown.join(", ")
        )))
    }
}

fn process_flow(
    flow: &mut Flow,
    loader: &Loader,
    dry_run: bool,
) -> std::result::Result<FlowOutcome, LoadError> {
    let name = flow.name().to_string();

    let num_files = flow.list_files().map_err(|e| {
        LoadError::critical(
            &name,
            format!("{}: cannot scan \"{}\": {}", name, flow.input_folder().display(), e),
        )
    })?;

    if num_files == 0 {
        info!("{}: nothing to load", name);
        return Ok(FlowOutcome::skipped(&name));
    }

    if dry_run {
        let job = flow
            .to_job()
            .map_err(|e| LoadError::critical(&name, format!("{}: {}", name, e)))?;
        let command = loader.prepare(&job)?;
        info!("{}: dry run, would run {}", name, command);
        return Ok(FlowOutcome::prepared(&name, num_files, command));
    }

    let report = flow.load(loader)?;
    info!("{}", report.message());
    Ok(FlowOutcome::loaded(&report, num_files))
}
