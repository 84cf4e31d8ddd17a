//! Source file digests shared between the watcher and the rebuild loop.
//!
//! The cache is an explicit resource: it is created with [`SourceFileCache::acquire`],
//! handed around as an `Arc`, and emptied with [`SourceFileCache::shutdown`]
//! when the build stream stops. It lets the rebuild loop skip builds for
//! change notifications that did not actually change any bytes (editors that
//! rewrite a file on save, `touch`, checkouts of identical content).

use crate::hash::{hash_bytes, ContentHash};
use crate::stream::ChangeBatch;
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct SourceFileCache {
    root: PathBuf,
    digests: Mutex<HashMap<PathBuf, ContentHash>>,
    active: AtomicBool,
}

impl SourceFileCache {
    /// Create a cache for sources under `root`.
    pub fn acquire(root: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            digests: Mutex::new(HashMap::default()),
            active: AtomicBool::new(true),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Record the current digest of `paths` without reporting changes.
    pub async fn prime<I>(&self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            if let Ok(bytes) = tokio::fs::read(&path).await {
                self.digests.lock().insert(path, hash_bytes(&bytes));
            }
        }
    }

    /// Invalidate entries touched by `batch` and report whether any source
    /// content actually changed.
    ///
    /// Added and removed files always count as changes. A modified file
    /// counts only if its new digest differs from the cached one, or if it
    /// had no cached digest yet.
    pub async fn apply(&self, batch: &ChangeBatch) -> bool {
        if !self.is_active() {
            return !batch.is_empty();
        }

        let mut changed = !batch.added.is_empty() || !batch.removed.is_empty();

        let mut fresh = Vec::with_capacity(batch.added.len() + batch.modified.len());
        for path in batch.added.iter().chain(batch.modified.iter()) {
            let digest = tokio::fs::read(path).await.ok().map(|b| hash_bytes(&b));
            fresh.push((path.clone(), digest));
        }

        let mut digests = self.digests.lock();
        for path in &batch.removed {
            digests.remove(path);
        }
        for (path, digest) in fresh {
            match digest {
                Some(digest) => {
                    if digests.insert(path.clone(), digest) != Some(digest) {
                        changed = true;
                    }
                }
                None => {
                    digests.remove(&path);
                    changed = true;
                }
            }
        }

        changed
    }

    /// Drop the digests recorded for `batch`, so the next notification for
    /// any of its files counts as a change again.
    ///
    /// Called after a build triggered by `batch` failed. Without this a
    /// retry with identical content would be skipped.
    pub fn forget(&self, batch: &ChangeBatch) {
        let mut digests = self.digests.lock();
        for path in batch.added.iter().chain(batch.modified.iter()) {
            digests.remove(path);
        }
    }

    pub fn len(&self) -> usize {
        self.digests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached digest. Later `apply` calls report all changes.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::Release);
        self.digests.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn modified(path: &Path) -> ChangeBatch {
        ChangeBatch {
            modified: BTreeSet::from([path.to_path_buf()]),
            ..ChangeBatch::default()
        }
    }

    #[tokio::test]
    async fn test_identical_save_is_not_a_change() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.ts");
        fs::write(&file, "export const a = 1;").unwrap();

        let cache = SourceFileCache::acquire(temp.path());
        cache.prime([file.clone()]).await;

        assert!(!cache.apply(&modified(&file)).await);

        fs::write(&file, "export const a = 2;").unwrap();
        assert!(cache.apply(&modified(&file)).await);
        assert!(!cache.apply(&modified(&file)).await);
    }

    #[tokio::test]
    async fn test_unknown_file_counts_as_change() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("new.ts");
        fs::write(&file, "x").unwrap();

        let cache = SourceFileCache::acquire(temp.path());
        assert!(cache.apply(&modified(&file)).await);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_removal_invalidates_entry() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("gone.ts");
        fs::write(&file, "x").unwrap();

        let cache = SourceFileCache::acquire(temp.path());
        cache.prime([file.clone()]).await;

        let batch = ChangeBatch {
            removed: BTreeSet::from([file.clone()]),
            ..ChangeBatch::default()
        };
        assert!(cache.apply(&batch).await);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_forget_makes_identical_save_count_again() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.ts");
        fs::write(&file, "export const a = 1;").unwrap();

        let cache = SourceFileCache::acquire(temp.path());
        cache.prime([file.clone()]).await;
        assert!(!cache.apply(&modified(&file)).await);

        cache.forget(&modified(&file));
        assert!(cache.is_empty());
        assert!(cache.apply(&modified(&file)).await);
        assert!(!cache.apply(&modified(&file)).await);
    }

    #[tokio::test]
    async fn test_shutdown_clears_and_disables() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.ts");
        fs::write(&file, "x").unwrap();

        let cache = SourceFileCache::acquire(temp.path());
        cache.prime([file.clone()]).await;
        cache.shutdown();

        assert!(cache.is_empty());
        assert!(!cache.is_active());
        assert!(cache.apply(&modified(&file)).await);
    }
}
