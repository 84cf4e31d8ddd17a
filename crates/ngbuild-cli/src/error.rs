//! Error handling for the ngbuild CLI.
//!
//! `CliError` is the top-level type returned by every command. Domain errors
//! (`ConfigError`, core pipeline errors) convert into it via `#[from]`, and
//! `main` turns the final error into a miette report.
//!
//! # Example
//!
//! ```rust,no_run
//! use ngbuild_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_index(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Set `index` in ngbuild.json to your source document")
//! }
//! ```

mod diagnostic;

pub use diagnostic::cli_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Config file, environment or flags could not be turned into a config
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised by the build pipeline
    #[error(transparent)]
    Build(#[from] ngbuild_core::Error),

    /// A one-shot build finished without producing output
    #[error("Build failed\n\n{0}")]
    BuildFailed(String),

    /// A path the user pointed at does not exist
    #[error("No such file or directory: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binding or running the dev server failed
    #[error("Server error: {0}")]
    Server(String),

    /// The OS file watcher could not be started
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another error with added context or a hint
    #[error("{0}")]
    Custom(String),
}

/// Problems with the configuration sources or values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file passed with --config doesn't exist
    #[error("Config file not found: {}\n\nHint: Create an ngbuild.json file or pass a valid --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Config file extension is neither .json nor .toml
    #[error("Unsupported config format: {}\n\nHint: Use ngbuild.json or ngbuild.toml", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Config sources could not be merged or deserialized
    #[error("{0}\n\nHint: Check ngbuild.json syntax, field names and NGBUILD_* environment variables")]
    Extract(#[from] Box<figment::Error>),

    /// A required value is empty
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Config key
        field: String,
        /// How to provide the field
        hint: String,
    },

    /// A value parsed but cannot be used
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Config key
        field: String,
        /// The invalid value
        value: String,
        /// Correct values
        hint: String,
    },
}

/// `Result` defaulting to [`CliError`].
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Attach paths, hints and context to fallible calls.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
