//! Error types for the build pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running bundler contexts or collecting their output.
///
/// Registry ingestion itself never fails; everything here happens before
/// ingestion, so a failed build leaves the last good output in place.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error with the path that caused it
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External build command could not be started or exited unsuccessfully
    #[error("Build command `{command}` failed{}: {stderr}", .status.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Global style/script entry options that cannot be normalized
    #[error("Invalid entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    /// Two bundler contexts emitted the same virtual path
    #[error("Output path {path} is produced by both '{first}' and '{second}'")]
    DuplicateOutput {
        path: String,
        first: String,
        second: String,
    },

    /// Output directory would be cleaned although it is not inside the workspace
    #[error("Refusing to clean output path outside the workspace: {}", .0.display())]
    UnsafeOutputPath(PathBuf),

    /// Directory walk failed while collecting output or assets
    #[error("Failed to walk {}: {message}", .root.display())]
    Walk { root: PathBuf, message: String },

    /// Background build task panicked or was cancelled
    #[error("Build task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for ngbuild-core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
