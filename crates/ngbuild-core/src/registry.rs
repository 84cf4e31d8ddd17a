//! In-memory registry of the latest build output.
//!
//! The registry holds exactly one record per virtual path. Each call to
//! [`OutputFileRegistry::ingest`] replaces the registry's view of "current
//! output" with a complete new file set and classifies every path as added,
//! changed, unchanged or removed.
//!
//! Change detection is two-staged: a size mismatch is an immediate change
//! signal, and only equal-size files pay for a content hash. The hash of a
//! stored record is computed lazily and cached until its contents change.

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, ContentHash};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

/// Extension of sourcemap side artifacts. These are stored but never diffed.
pub const SOURCEMAP_EXTENSION: &str = ".map";

/// One file produced by a bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Output path, relative to the output root (normalized on ingestion)
    pub path: String,
    /// Exact bytes produced by the build
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// The last known state of one virtual output file.
#[derive(Debug, Clone)]
pub struct OutputFileRecord {
    /// Bytes from the last build that touched this file
    pub contents: Vec<u8>,
    /// Cached `contents.len()`
    pub size: usize,
    /// Lazily computed digest of `contents`
    hash: Option<ContentHash>,
    /// Whether the most recent ingestion changed this file
    pub updated: bool,
}

impl OutputFileRecord {
    fn changed(contents: Vec<u8>) -> Self {
        Self {
            size: contents.len(),
            contents,
            hash: None,
            updated: true,
        }
    }

    /// Cached digest, if one has been computed for the current contents.
    pub fn hash(&self) -> Option<ContentHash> {
        self.hash
    }

    fn hash_or_compute(&mut self) -> ContentHash {
        *self.hash.get_or_insert_with(|| hash_bytes(&self.contents))
    }
}

/// Per-ingestion classification of paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Paths seen for the first time
    pub added: Vec<String>,
    /// Paths whose contents differ from the previous build
    pub changed: Vec<String>,
    /// Paths whose contents are identical to the previous build
    pub unchanged: Vec<String>,
    /// Paths evicted because the new build no longer produced them
    pub removed: Vec<String>,
}

impl IngestSummary {
    /// Returns true if anything was added, changed or removed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }
}

/// Normalize an output path to the registry's virtual-path convention.
///
/// Virtual paths always use `/` separators and start with exactly one `/`.
pub fn normalize_virtual_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    format!("/{}", trimmed.trim_start_matches('/'))
}

/// Normalize every path and keep one entry per path, in first-seen order
/// with the contents of the last file for that path.
fn collapse_duplicates(files: Vec<OutputFile>) -> Vec<(String, Vec<u8>)> {
    let mut collapsed: Vec<(String, Vec<u8>)> = Vec::with_capacity(files.len());
    let mut positions: HashMap<String, usize> = HashMap::default();
    for file in files {
        let path = normalize_virtual_path(&file.path);
        match positions.get(&path) {
            Some(&at) => {
                tracing::warn!(path = %path, "output path emitted twice, keeping the last file");
                collapsed[at].1 = file.contents;
            }
            None => {
                positions.insert(path.clone(), collapsed.len());
                collapsed.push((path, file.contents));
            }
        }
    }
    collapsed
}

/// Returns true if `path` names a sourcemap side artifact.
pub fn is_sourcemap(path: &str) -> bool {
    path.ends_with(SOURCEMAP_EXTENSION)
}

/// Mapping from virtual path to the current output record.
///
/// The registry is the sole owner of its records. Other components read it
/// through shared references (or a read guard in the dev server).
#[derive(Debug, Clone, Default)]
pub struct OutputFileRegistry {
    files: BTreeMap<String, OutputFileRecord>,
}

impl OutputFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current output with `files`, recording per-file change status.
    ///
    /// Afterwards the registry's key set equals the normalized path set of
    /// `files`. Records for paths that were not produced are evicted. When
    /// several files normalize to the same path, the last one wins and each
    /// path is diffed exactly once.
    pub fn ingest(&mut self, files: Vec<OutputFile>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        let files = collapse_duplicates(files);
        let stale: Vec<String> = {
            let seen: HashSet<&str> = files.iter().map(|(path, _)| path.as_str()).collect();
            self.files
                .keys()
                .filter(|path| !seen.contains(path.as_str()))
                .cloned()
                .collect()
        };

        for (path, contents) in files {
            if is_sourcemap(&path) {
                self.files.insert(
                    path.clone(),
                    OutputFileRecord {
                        size: contents.len(),
                        contents,
                        hash: None,
                        updated: false,
                    },
                );
                summary.unchanged.push(path);
                continue;
            }

            match self.files.entry(path.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(OutputFileRecord::changed(contents));
                    summary.added.push(path);
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    if existing.size != contents.len() {
                        *existing = OutputFileRecord::changed(contents);
                        summary.changed.push(path);
                    } else if existing.hash_or_compute() == hash_bytes(&contents) {
                        existing.updated = false;
                        summary.unchanged.push(path);
                    } else {
                        *existing = OutputFileRecord::changed(contents);
                        summary.changed.push(path);
                    }
                }
            }
        }

        for path in stale {
            self.files.remove(&path);
            summary.removed.push(path);
        }

        tracing::debug!(
            added = summary.added.len(),
            changed = summary.changed.len(),
            unchanged = summary.unchanged.len(),
            removed = summary.removed.len(),
            "ingested build output"
        );

        summary
    }

    /// Look up a record by virtual path.
    pub fn get(&self, path: &str) -> Option<&OutputFileRecord> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All virtual paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputFileRecord)> {
        self.files.iter().map(|(path, record)| (path.as_str(), record))
    }

    /// Paths whose record is flagged `updated` by the latest ingestion.
    pub fn updated_paths(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, record)| record.updated)
            .map(|(path, _)| path)
    }

    /// Write every record below `dir`, creating parent directories as needed.
    ///
    /// Used by one-shot builds; the dev server never touches the disk.
    pub fn write_to_dir(&self, dir: &Path) -> Result<usize> {
        for (path, record) in &self.files {
            let target = dir.join(path.trim_start_matches('/'));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            std::fs::write(&target, &record.contents).map_err(|e| Error::io(&target, e))?;
        }
        Ok(self.files.len())
    }
}
