//! Development server.
//!
//! - Build output served from the in-memory registry
//! - Static assets served from their source location
//! - Live reload via Server-Sent Events
//! - File watching with debouncing

pub mod asset_middleware;
pub mod server;
pub mod state;
pub mod watcher;

pub use server::{router, DevServer, RELOAD_SCRIPT_PATH, SSE_PATH};
pub use state::{BuildStatus, DevServerState, ServeOptions, SharedState};
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    /// Build completed successfully
    BuildCompleted { duration_ms: u64 },

    /// Build failed; the previous output is still being served
    BuildFailed { error: String },

    /// Output changed, reload the page
    Reload { paths: Vec<String> },

    /// Client connected
    ClientConnected { id: usize },
}
