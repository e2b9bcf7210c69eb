//! Build automation tasks for flowload
//!
//! Currently one task: regenerate the CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for flowload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<flowload_cli::Cli>();

    let content = format!(
        r#"# Flowload CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

`flowload` scans the input folder of every active flow, writes a SQL*Loader
control file for the matching files, runs `sqlldr` and reports the outcome.
Flows run one after the other; a failing flow does not stop the next one
unless `stop_on_critical` is set.

## Usage

```bash
# Load every active flow
flowload --config /srv/flowload/etc/flowload.toml

# Only the xdr flow, without running the loader, with a JSON report
flowload --config /srv/flowload/etc/flowload.toml --flow xdr --dry-run --report run.json
```

## Exit Codes

- `0` - every flow loaded, loaded partially within `sqlldr_max_error`, or had no files
- `1` - at least one flow failed, or the run could not start
- `2` - invalid command line

## Options

{}

## Environment Variables

- `FLOWLOAD_CONFIG` - Configuration file, instead of `--config`
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILE_PREFIX`, `LOG_FILTER` - Override the logging setup
- `RUST_LOG` - Additional filter directives

A `.env` file in the working directory is read before the command line.

## Configuration

```toml
[global]
screenlog = true
logging_lev = "info"
active_flows = ["xdr"]
sqlldr_max_error = 10

[paths]
base_dir = "/srv/flowload"
sqlldr_bin = "/opt/oracle/bin/sqlldr"

[databases.vqsd]
user = "toto"
pwd = "poipoi"
sid = "VQSD"

[flows.xdr]
delimiter = "|"
file_pattern = '^xdr_\d+$'
loadtable = "VQS_LOADTABLE_TDM"
database = "vqsd"
field_names = "call_id, dt_start, report_date"
```

---

*This documentation is automatically generated from the CLI source code. To update, run `cargo run -p xtask -- generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
