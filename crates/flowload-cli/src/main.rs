//! Flowload CLI - Main entry point

use anyhow::Context;
use clap::Parser;
use flowload_cli::{Cli, Config};
use flowload_common::logging::init_logging;
use std::process;
use tracing::{error, info, warn};

fn main() {
    process::exit(real_main());
}

fn real_main() -> i32 {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return 0;
    }

    match execute(&cli) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// `Ok(false)` when the run finished but a flow failed critically
fn execute(cli: &Cli) -> anyhow::Result<bool> {
    let config_file = cli
        .config
        .as_ref()
        .context("--config is required")?;
    let config = Config::load(config_file)?;

    let log_config = config.log_config(cli.verbose).apply_env()?;
    let _guard = init_logging(&log_config)?;

    for warning in &config.warnings {
        warn!("{}", warning);
    }
    info!(config = %config.config_file.display(), "Configuration loaded");

    let summary = flowload_cli::run(config, &cli.run_options())?;

    if let Some(path) = &cli.report {
        summary
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(report = %path.display(), "Run report written");
    }

    Ok(!summary.has_failures())
}
