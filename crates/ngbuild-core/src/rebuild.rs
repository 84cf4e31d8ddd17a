//! State carried between incremental builds.

use crate::context::{BundleOutput, BundlerContext};
use crate::error::{Error, Result};
use crate::registry::normalize_virtual_path;
use crate::source_cache::SourceFileCache;
use crate::stream::ChangeBatch;
use rustc_hash::FxHashMap as HashMap;
use std::sync::Arc;

/// Live bundler contexts plus the caches that survive between rebuilds.
///
/// Created before the initial build and kept across failed builds, so a
/// broken first build can still be fixed while watching.
/// [`RebuildState::dispose`] must be called when watching stops.
pub struct RebuildState {
    contexts: Vec<Box<dyn BundlerContext>>,
    /// Digest cache shared with the watcher loop
    pub source_cache: Option<Arc<SourceFileCache>>,
    /// Most recent change notification that triggered a rebuild
    pub last_changes: Option<ChangeBatch>,
}

impl RebuildState {
    pub fn new(
        contexts: Vec<Box<dyn BundlerContext>>,
        source_cache: Option<Arc<SourceFileCache>>,
    ) -> Self {
        Self {
            contexts,
            source_cache,
            last_changes: None,
        }
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn context_names(&self) -> Vec<String> {
        self.contexts.iter().map(|c| c.name().to_string()).collect()
    }

    /// Run every context once. See [`run_build`].
    pub async fn rebuild(&mut self) -> Result<BundleOutput> {
        run_build(&mut self.contexts).await
    }

    /// Dispose every context and shut the source cache down.
    pub async fn dispose(mut self) {
        for context in &mut self.contexts {
            tracing::debug!(context = context.name(), "disposing bundler context");
            context.dispose().await;
        }
        if let Some(cache) = self.source_cache.take() {
            cache.shutdown();
        }
    }
}

/// Run all contexts in order and merge their output.
///
/// The first failing context aborts the build; nothing from a failed build
/// is returned, so callers never ingest partial output. Two contexts that
/// emit the same virtual path (after normalization) fail the build with
/// [`Error::DuplicateOutput`].
pub async fn run_build(contexts: &mut [Box<dyn BundlerContext>]) -> Result<BundleOutput> {
    let mut merged = BundleOutput::default();
    let mut owners: HashMap<String, (usize, String)> = HashMap::default();
    for (index, context) in contexts.iter_mut().enumerate() {
        let output = context.rebuild().await.inspect_err(|e| {
            tracing::debug!(context = context.name(), error = %e, "bundler context failed");
        })?;
        tracing::trace!(
            context = context.name(),
            files = output.files.len(),
            "bundler context finished"
        );
        for file in &output.files {
            let path = normalize_virtual_path(&file.path);
            match owners.get(&path) {
                Some((owner, first)) if *owner != index => {
                    return Err(Error::DuplicateOutput {
                        path,
                        first: first.clone(),
                        second: context.name().to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(path, (index, context.name().to_string()));
                }
            }
        }
        merged.files.extend(output.files);
        merged.warnings.extend(output.warnings);
    }
    Ok(merged)
}
