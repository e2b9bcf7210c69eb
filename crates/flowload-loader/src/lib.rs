//! Flowload Loader Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Drives one SQL*Loader load cycle for a set of delimited files:
//!
//! 1. write a control file describing the files, the target table and the
//!    field list ([`control`])
//! 2. run the bulk-loader binary and classify its exit code ([`exit_code`])
//! 3. scrape counts and error lines out of its log ([`log_parser`])
//! 4. turn all of that into a [`LoadReport`] or a [`flowload_common::LoadError`],
//!    moving reject files and the log aside when the load was not clean
//!    ([`backup`])
//!
//! # Example
//!
//! ```no_run
//! use flowload_loader::{Database, LoadJob, Loader, LoaderConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let loader = Loader::new(LoaderConfig::new(
//!         "/srv/flowload/venv/orahome/sqlldr",
//!         "/srv/flowload/log",
//!         "/srv/flowload/var",
//!         "/srv/flowload/sqlldr",
//!     ))?;
//!
//!     let db = Database::new("vqsd", "toto", "poipoi", "VQSD")?;
//!     let job = LoadJob::builder("xdr", db, "VQS_LOADTABLE_TDM")
//!         .delimiter('|')
//!         .field_names(["call_id", "dt_start", "report_date"])
//!         .files(["/srv/flowload/data/xdr_001"])
//!         .build()?;
//!
//!     match loader.load(&job) {
//!         Ok(report) => println!("{}", report.message()),
//!         Err(err) => err.log(),
//!     }
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod control;
pub mod database;
pub mod error;
pub mod exit_code;
pub mod job;
pub mod loader;
pub mod log_parser;

// Re-export commonly used types
pub use control::FieldRules;
pub use database::Database;
pub use error::{LoaderError, Result};
pub use exit_code::{ExitCodeTable, ExitSymbol};
pub use job::{LoadJob, DEFAULT_DELIMITER};
pub use loader::{LoadReport, Loader, LoaderConfig};
pub use log_parser::{LogParser, LogSummary};
