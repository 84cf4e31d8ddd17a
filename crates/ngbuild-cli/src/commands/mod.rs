//! Command implementations for the ngbuild CLI.
//!
//! - [`serve`] - In-memory development server with watch mode
//! - [`build`] - One-shot build written to disk
//! - [`schema`] - JSON schema for the config file
//!
//! Each command provides an `execute` function that takes its parsed
//! arguments and returns a Result.

pub mod build;
pub(crate) mod pipeline;
pub mod schema;
pub mod serve;

pub use build::execute as build_execute;
pub use schema::execute as schema_execute;
pub use serve::execute as serve_execute;
