//! Reload decisions derived from the registry's `updated` flags.
//!
//! The dev server always asks clients for a full page reload. A
//! [`ModuleGraph`] is available for callers that want granular invalidation;
//! it expands the updated set to every transitive importer so that nothing
//! depending on a changed file is left stale.

use crate::registry::{IngestSummary, OutputFileRegistry};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a live session must do after an ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadActions {
    /// Virtual paths whose served contents changed
    pub invalidate_paths: BTreeSet<String>,
    /// Whether connected clients should reload the whole page
    pub full_reload: bool,
}

impl ReloadActions {
    pub fn is_empty(&self) -> bool {
        self.invalidate_paths.is_empty() && !self.full_reload
    }
}

/// Compute reload actions from the registry alone.
///
/// `invalidate_paths` is exactly the set of records flagged `updated`.
pub fn compute_reload_actions(registry: &OutputFileRegistry) -> ReloadActions {
    let invalidate_paths: BTreeSet<String> =
        registry.updated_paths().map(str::to_string).collect();
    let full_reload = !invalidate_paths.is_empty();
    ReloadActions {
        invalidate_paths,
        full_reload,
    }
}

/// Compute reload actions, also reloading when files were only evicted.
///
/// Evicted paths are not in the registry anymore so they carry no `updated`
/// flag, but a page that still references them must be refreshed.
pub fn compute_reload_actions_with_summary(
    registry: &OutputFileRegistry,
    summary: &IngestSummary,
) -> ReloadActions {
    let mut actions = compute_reload_actions(registry);
    if !summary.removed.is_empty() {
        actions.full_reload = true;
    }
    actions
}

/// How a session reacts to invalidated paths.
#[derive(Debug, Clone, Default)]
pub enum ReloadStrategy {
    /// Reload the whole page whenever anything changed
    #[default]
    FullReload,
    /// Invalidate only the affected modules of a known graph
    Granular(ModuleGraph),
}

impl ReloadStrategy {
    /// Turn registry-level actions into the set of modules to invalidate.
    ///
    /// With [`ReloadStrategy::Granular`] the set is expanded to its transitive
    /// importers and no full reload is requested.
    pub fn apply(&self, actions: ReloadActions) -> ReloadActions {
        match self {
            ReloadStrategy::FullReload => actions,
            ReloadStrategy::Granular(graph) => {
                let invalidate_paths = graph.invalidate(&actions.invalidate_paths);
                ReloadActions {
                    invalidate_paths,
                    full_reload: false,
                }
            }
        }
    }
}

/// Import edges between virtual paths.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// imported path -> paths that import it
    importers: HashMap<String, HashSet<String>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `importer` depends on `imported`.
    pub fn add_import(&mut self, importer: impl Into<String>, imported: impl Into<String>) {
        self.importers
            .entry(imported.into())
            .or_default()
            .insert(importer.into());
    }

    /// Direct importers of `path`.
    pub fn importers_of(&self, path: &str) -> impl Iterator<Item = &str> {
        self.importers
            .get(path)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Changed paths plus everything that transitively imports them.
    pub fn invalidate(&self, changed: &BTreeSet<String>) -> BTreeSet<String> {
        let mut affected = changed.clone();
        let mut to_visit: Vec<String> = changed.iter().cloned().collect();

        while let Some(path) = to_visit.pop() {
            if let Some(importers) = self.importers.get(&path) {
                for importer in importers {
                    if affected.insert(importer.clone()) {
                        to_visit.push(importer.clone());
                    }
                }
            }
        }

        affected
    }
}
