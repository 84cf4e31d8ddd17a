//! Build results as a cancellable stream.
//!
//! A producer task owns the [`RebuildState`]. It runs the initial build, then
//! rebuilds for every change batch it receives, pushing a [`BuildResult`] on
//! a channel after each pass. The consumer pulls results with
//! [`BuildStream::recv`] and ends the stream with [`BuildStream::stop`], which
//! waits for the producer to dispose its contexts before returning.

use crate::assets::{AssetMap, AssetPattern};
use crate::error::Result;
use crate::index_html::{IndexDocument, INDEX_PATH};
use crate::rebuild::RebuildState;
use crate::registry::{normalize_virtual_path, IngestSummary, OutputFile, OutputFileRegistry};
use crate::reload::{compute_reload_actions_with_summary, ReloadActions};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Registry handle shared between the build loop (writer) and the server (readers).
pub type SharedRegistry = Arc<RwLock<OutputFileRegistry>>;

/// Asset map handle shared the same way as [`SharedRegistry`].
pub type SharedAssetMap = Arc<RwLock<AssetMap>>;

/// One batch of file-system changes reported by the watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub added: BTreeSet<PathBuf>,
    pub modified: BTreeSet<PathBuf>,
    pub removed: BTreeSet<PathBuf>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Fold a later batch into this one. The latest event for a path wins.
    pub fn merge(&mut self, later: ChangeBatch) {
        for path in later.added {
            self.removed.remove(&path);
            self.added.insert(path);
        }
        for path in later.modified {
            self.removed.remove(&path);
            if !self.added.contains(&path) {
                self.modified.insert(path);
            }
        }
        for path in later.removed {
            self.added.remove(&path);
            self.modified.remove(&path);
            self.removed.insert(path);
        }
    }
}

/// Outcome of one build pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildResult {
    pub success: bool,
    pub duration_ms: u64,
    /// Present only for successful builds
    pub summary: Option<IngestSummary>,
    /// Present only for successful builds
    pub reload: Option<ReloadActions>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BuildResult {
    fn failed(error: String, duration_ms: u64) -> Self {
        Self {
            success: false,
            duration_ms,
            errors: vec![error],
            ..Self::default()
        }
    }

    /// Whether connected clients should reload after this result.
    pub fn should_reload(&self) -> bool {
        self.reload.as_ref().is_some_and(|r| r.full_reload)
    }
}

/// Everything a build pass needs besides the bundler contexts.
pub struct BuildPipeline {
    root: PathBuf,
    registry: SharedRegistry,
    assets: SharedAssetMap,
    asset_patterns: Vec<AssetPattern>,
    index: Option<IndexDocument>,
}

impl BuildPipeline {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry: SharedRegistry::default(),
            assets: SharedAssetMap::default(),
            asset_patterns: Vec::new(),
            index: None,
        }
    }

    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_asset_map(mut self, assets: SharedAssetMap) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_asset_patterns(mut self, patterns: Vec<AssetPattern>) -> Self {
        self.asset_patterns = patterns;
        self
    }

    pub fn with_index(mut self, index: Option<IndexDocument>) -> Self {
        self.index = index;
        self
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn asset_map(&self) -> SharedAssetMap {
        Arc::clone(&self.assets)
    }

    /// Run one build pass and publish its output.
    ///
    /// On failure the registry and asset map keep their previous contents.
    /// On success the default document is added if needed, the output is
    /// ingested, the asset map replaced, and reload actions computed from the
    /// freshly ingested state.
    pub async fn build(&self, state: &mut RebuildState) -> BuildResult {
        let start = Instant::now();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        let output = match state.rebuild().await {
            Ok(output) => output,
            Err(e) => return BuildResult::failed(e.to_string(), elapsed(start)),
        };

        let mut files = output.files;
        if let Err(e) = self.add_default_document(&mut files).await {
            return BuildResult::failed(e.to_string(), elapsed(start));
        }

        let assets = match self.collect_assets().await {
            Ok(assets) => assets,
            Err(e) => return BuildResult::failed(e.to_string(), elapsed(start)),
        };

        let (summary, reload) = {
            let mut registry = self.registry.write();
            let summary = registry.ingest(files);
            let reload = compute_reload_actions_with_summary(&registry, &summary);
            (summary, reload)
        };
        self.assets.write().replace(assets);

        BuildResult {
            success: true,
            duration_ms: elapsed(start),
            summary: Some(summary),
            reload: Some(reload),
            errors: Vec::new(),
            warnings: output.warnings,
        }
    }

    async fn add_default_document(&self, files: &mut Vec<OutputFile>) -> Result<()> {
        let Some(index) = &self.index else {
            return Ok(());
        };
        if files
            .iter()
            .any(|file| normalize_virtual_path(&file.path) == INDEX_PATH)
        {
            return Ok(());
        }
        let html = index.render(&self.root).await?;
        files.push(OutputFile::new(INDEX_PATH, html));
        Ok(())
    }

    async fn collect_assets(&self) -> Result<AssetMap> {
        if self.asset_patterns.is_empty() {
            return Ok(AssetMap::new());
        }
        let root = self.root.clone();
        let patterns = self.asset_patterns.clone();
        tokio::task::spawn_blocking(move || AssetMap::collect(&root, &patterns)).await?
    }
}

/// Consumer side of a running build loop.
pub struct BuildStream {
    results: mpsc::Receiver<BuildResult>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl BuildStream {
    /// Start the producer task.
    ///
    /// Without a change receiver the stream yields the initial build result
    /// and then ends.
    pub fn spawn(
        pipeline: BuildPipeline,
        state: RebuildState,
        changes: Option<mpsc::Receiver<ChangeBatch>>,
    ) -> Self {
        let (tx, results) = mpsc::channel(16);
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(produce(pipeline, state, changes, tx, stop_rx));
        Self {
            results,
            stop: Some(stop),
            task,
        }
    }

    /// Next build result, or `None` once the producer has finished.
    pub async fn recv(&mut self) -> Option<BuildResult> {
        self.results.recv().await
    }

    /// Stop watching and wait for the producer to dispose its resources.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.results.close();
        self.task.await?;
        Ok(())
    }
}

async fn produce(
    pipeline: BuildPipeline,
    mut state: RebuildState,
    changes: Option<mpsc::Receiver<ChangeBatch>>,
    tx: mpsc::Sender<BuildResult>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let initial = tokio::select! {
        biased;
        _ = &mut stop_rx => {
            state.dispose().await;
            return;
        }
        result = pipeline.build(&mut state) => result,
    };
    log_result(&initial);

    let Some(mut changes) = changes else {
        let _ = tx.send(initial).await;
        state.dispose().await;
        return;
    };
    if tx.send(initial).await.is_err() {
        state.dispose().await;
        return;
    }

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            batch = changes.recv() => {
                let Some(mut batch) = batch else { break };
                while let Ok(later) = changes.try_recv() {
                    batch.merge(later);
                }

                if let Some(cache) = &state.source_cache {
                    if !cache.apply(&batch).await {
                        tracing::debug!(files = batch.len(), "change batch left sources unchanged, skipping rebuild");
                        continue;
                    }
                }

                tracing::debug!(
                    added = batch.added.len(),
                    modified = batch.modified.len(),
                    removed = batch.removed.len(),
                    "rebuilding"
                );
                state.last_changes = Some(batch);
                let result = pipeline.build(&mut state).await;
                log_result(&result);
                if !result.success {
                    if let (Some(cache), Some(batch)) = (&state.source_cache, &state.last_changes) {
                        cache.forget(batch);
                    }
                }
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        }
    }

    state.dispose().await;
}

fn log_result(result: &BuildResult) {
    if result.success {
        tracing::info!(duration_ms = result.duration_ms, "build succeeded");
    } else {
        for error in &result.errors {
            tracing::error!(%error, "build failed");
        }
    }
    for warning in &result.warnings {
        tracing::warn!(%warning, "build warning");
    }
}
