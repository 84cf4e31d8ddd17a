//! ngbuild CLI - in-memory development server and build runner.
//!
//! The CLI wires the `ngbuild-core` pipeline to the outside world: it loads
//! configuration, runs the bundling units, serves their output from memory
//! and reloads connected browsers when a rebuild changes what is served.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line argument definitions
//! - [`commands`] - `serve`, `build` and `schema` implementations
//! - [`config`] - Layered configuration (file, environment, flags)
//! - [`dev`] - Development server, live reload and file watching
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status lines and output summaries
//!
//! # Example
//!
//! ```rust,no_run
//! use ngbuild_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     // CLI command implementations...
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use config::NgbuildConfig;
pub use error::{CliError, ConfigError, Result, ResultExt};
