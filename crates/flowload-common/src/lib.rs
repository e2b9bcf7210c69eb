//! Flowload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error taxonomy and logging setup for the flowload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`LoadError`] outcome of a single load cycle and
//!   its [`Severity`]
//! - **Logging**: console/file `tracing` setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use flowload_common::{LoadError, Severity};
//!
//! fn report(err: &LoadError) {
//!     if err.severity() == Severity::Warning {
//!         err.log();
//!     }
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{LoadError, Result, Severity};
