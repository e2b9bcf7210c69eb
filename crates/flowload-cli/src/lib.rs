//! Flowload CLI Library
//!
//! Everything around the load cycle itself:
//!
//! - **Configuration**: the TOML file with flows, databases and paths ([`config`])
//! - **Flows**: input folder scanning and job building ([`flow`])
//! - **Single instance**: the pid file guard ([`pidfile`])
//! - **Runs**: sequential processing of the active flows ([`orchestrator`])
//! - **Reporting**: the per-flow outcome, optionally written as JSON ([`report`])
//!
//! The `flowload` binary wires these together; the load cycle lives in
//! `flowload-loader`.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod pidfile;
pub mod report;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliError, Result};
pub use orchestrator::{run, RunOptions};
pub use report::RunSummary;

use clap::Parser;
use std::path::PathBuf;

/// Flowload - SQL*Loader batch orchestrator
///
/// Scans the input folder of every active flow and bulk-loads the matching
/// files into their Oracle table, one flow after the other.
#[derive(Parser, Debug)]
#[command(name = "flowload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(
        short,
        long,
        env = "FLOWLOAD_CONFIG",
        required_unless_present = "markdown_help"
    )]
    pub config: Option<PathBuf>,

    /// Only process these flows (repeatable)
    #[arg(long = "flow", value_name = "NAME")]
    pub flows: Vec<String>,

    /// Write control files and show loader command lines without loading
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Debug output, also on the console
    #[arg(short, long)]
    pub verbose: bool,

    /// Print help as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            only_flows: self.flows.clone(),
        }
    }
}
