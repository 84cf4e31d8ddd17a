//! Shared state for the development server.
//!
//! The registry and asset map handles are shared with the build stream,
//! which is their only writer. Request handlers take short read locks for
//! single lookups and never hold a guard across an await point.

use crate::config::NgbuildConfig;
use crate::dev::DevEvent;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use ngbuild_core::{SharedAssetMap, SharedRegistry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No build has finished yet
    NotStarted,
    /// Last build succeeded
    Success { duration_ms: u64 },
    /// Last build failed; the previous output is still served
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Request-handling options taken from the configuration.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Base path, always starting and ending with `/`
    pub serve_path: String,
    /// Extra headers added to every served file
    pub headers: HeaderMap,
    /// Inject the reload client into served HTML
    pub live_reload: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            serve_path: "/".to_string(),
            headers: HeaderMap::new(),
            live_reload: true,
        }
    }
}

impl ServeOptions {
    pub fn from_config(config: &NgbuildConfig) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid response header"),
            }
        }

        let mut serve_path = config.serve_path.clone();
        if !serve_path.ends_with('/') {
            serve_path.push('/');
        }

        Self {
            serve_path,
            headers,
            live_reload: config.live_reload,
        }
    }
}

/// Connected SSE clients.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

/// Shared development server state.
pub struct DevServerState {
    status: RwLock<BuildStatus>,
    registry: SharedRegistry,
    assets: SharedAssetMap,
    clients: ClientRegistry,
    next_client_id: AtomicUsize,
    options: ServeOptions,
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;

impl DevServerState {
    pub fn new(registry: SharedRegistry, assets: SharedAssetMap, options: ServeOptions) -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            registry,
            assets,
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: AtomicUsize::new(0),
            options,
        }
    }

    pub fn options(&self) -> &ServeOptions {
        &self.options
    }

    pub fn complete_build(&self, duration_ms: u64) {
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Contents of a registry entry.
    pub fn output_file(&self, path: &str) -> Option<Vec<u8>> {
        self.registry.read().get(path).map(|record| record.contents.clone())
    }

    /// Real source path of a static asset.
    pub fn asset_source(&self, path: &str) -> Option<PathBuf> {
        self.assets.read().get(path).map(|source| source.to_path_buf())
    }

    /// Register a new SSE client.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send an event to every connected client, dropping disconnected ones.
    pub async fn broadcast(&self, event: &DevEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize dev event");
                return;
            }
        };

        let clients: Vec<_> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                failed_ids.push(id);
            }
        }
        for id in failed_ids {
            self.unregister_client(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngbuild_core::OutputFile;

    fn state() -> DevServerState {
        DevServerState::new(
            SharedRegistry::default(),
            SharedAssetMap::default(),
            ServeOptions::default(),
        )
    }

    #[test]
    fn test_build_status_lifecycle() {
        let state = state();
        assert_eq!(state.status(), BuildStatus::NotStarted);

        state.complete_build(150);
        assert!(state.status().is_success());

        state.fail_build("TS2322".to_string());
        assert_eq!(state.status().error(), Some("TS2322"));
    }

    #[test]
    fn test_reads_through_shared_registry() {
        let registry = SharedRegistry::default();
        let state = DevServerState::new(
            Arc::clone(&registry),
            SharedAssetMap::default(),
            ServeOptions::default(),
        );
        assert!(state.output_file("/main.js").is_none());

        registry.write().ingest(vec![OutputFile::new("main.js", "1")]);
        assert_eq!(state.output_file("/main.js"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_serve_options_from_config() {
        let mut config = NgbuildConfig {
            serve_path: "/app".to_string(),
            live_reload: false,
            ..NgbuildConfig::default()
        };
        config
            .headers
            .insert("X-Frame-Options".to_string(), "DENY".to_string());

        let options = ServeOptions::from_config(&config);
        assert_eq!(options.serve_path, "/app/");
        assert!(!options.live_reload);
        assert_eq!(options.headers["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_client_registration() {
        let state = state();
        let (id1, _rx1) = state.register_client();
        let (id2, _rx2) = state.register_client();

        assert_eq!(state.client_count(), 2);
        assert_ne!(id1, id2);

        state.unregister_client(id1);
        assert_eq!(state.client_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_drops_disconnected_clients() {
        let state = state();
        let (_id1, mut rx1) = state.register_client();
        let (_id2, rx2) = state.register_client();
        drop(rx2);

        state
            .broadcast(&DevEvent::Reload {
                paths: vec!["/main.js".to_string()],
            })
            .await;

        let message = rx1.recv().await.unwrap();
        assert!(message.contains("Reload"));
        assert_eq!(state.client_count(), 1);
    }
}
