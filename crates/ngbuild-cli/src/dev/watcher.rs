//! File system watcher with debouncing for development mode.
//!
//! Watches the workspace root recursively, drops changes to ignored paths,
//! and groups everything that arrives within the quiet period into one
//! [`ChangeBatch`].

use crate::error::{CliError, Result};
use ngbuild_core::ChangeBatch;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn into_batch(self) -> ChangeBatch {
        let mut batch = ChangeBatch::default();
        match self {
            FileChange::Created(p) => batch.added = BTreeSet::from([p]),
            FileChange::Modified(p) => batch.modified = BTreeSet::from([p]),
            FileChange::Removed(p) => batch.removed = BTreeSet::from([p]),
        }
        batch
    }
}

/// Recursive watcher feeding debounced change batches.
///
/// Dropping the watcher stops both the OS watch and the debounce task, which
/// closes the batch channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    debounce: JoinHandle<()>,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// # Errors
    ///
    /// Returns error if the root doesn't exist or the OS watcher cannot be created.
    pub fn spawn(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<ChangeBatch>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (change_tx, change_rx) = mpsc::channel(256);
        let (batch_tx, batch_rx) = mpsc::channel(16);

        let watch_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "file watcher error");
                    return;
                }
            };
            for change in classify(&event) {
                if should_ignore(change.path(), &watch_root, &ignore_patterns) {
                    continue;
                }
                // Runs on the notify thread, so blocking here is fine.
                if change_tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let debounce = tokio::spawn(debounce_changes(
            change_rx,
            Duration::from_millis(debounce_ms),
            batch_tx,
        ));

        Ok((
            Self {
                _watcher: watcher,
                root,
                debounce,
            },
            batch_rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.debounce.abort();
    }
}

/// Translate a notify event into per-path changes.
///
/// Renames are reported as a removal of the old path and a creation of the
/// new one; for single-sided rename events the path's existence decides.
fn classify(event: &Event) -> Vec<FileChange> {
    match &event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(FileChange::Created).collect(),
        EventKind::Remove(_) => event.paths.iter().cloned().map(FileChange::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            FileChange::Removed(event.paths[0].clone()),
            FileChange::Created(event.paths[1].clone()),
        ],
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                if p.exists() {
                    FileChange::Created(p.clone())
                } else {
                    FileChange::Removed(p.clone())
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => event.paths.iter().cloned().map(FileChange::Modified).collect(),
        _ => Vec::new(),
    }
}

/// Group changes into batches separated by `quiet` periods without events.
///
/// Ends when either channel closes; a pending batch is flushed first.
pub async fn debounce_changes(
    mut changes: mpsc::Receiver<FileChange>,
    quiet: Duration,
    batches: mpsc::Sender<ChangeBatch>,
) {
    while let Some(first) = changes.recv().await {
        let mut batch = first.into_batch();
        let mut closed = false;

        loop {
            match tokio::time::timeout(quiet, changes.recv()).await {
                Ok(Some(change)) => batch.merge(change.into_batch()),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        tracing::debug!(files = batch.len(), "file changes settled");
        if batches.send(batch).await.is_err() || closed {
            return;
        }
    }
}

/// Check if a path should be ignored.
///
/// Paths outside `root`, hidden files and directories, and paths matching an
/// ignore pattern are skipped. Patterns are either `*.ext` suffixes or
/// root-relative path prefixes / directory names.
pub fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };

    let path_str = rel_path.to_string_lossy().replace('\\', "/");

    for pattern in ignore_patterns {
        let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
        if pattern.is_empty() {
            continue;
        }
        if let Some(ext) = pattern.strip_prefix('*') {
            if path_str.ends_with(ext) {
                return true;
            }
        } else if path_str == pattern
            || path_str.starts_with(&format!("{pattern}/"))
            || path_str.contains(&format!("/{pattern}/"))
        {
            return true;
        }
    }

    rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_should_ignore_directories() {
        let root = PathBuf::from("/project");
        let patterns = patterns(&["node_modules", "dist"]);

        assert!(should_ignore(
            Path::new("/project/node_modules/rxjs/index.js"),
            &root,
            &patterns
        ));
        assert!(should_ignore(Path::new("/project/dist/main.js"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/src/distance.ts"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/src/app.ts"), &root, &patterns));
    }

    #[test]
    fn test_should_ignore_extension() {
        let root = PathBuf::from("/project");
        let patterns = patterns(&["*.log"]);
        assert!(should_ignore(Path::new("/project/npm-debug.log"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/src/main.ts"), &root, &patterns));
    }

    #[test]
    fn test_should_ignore_hidden_and_outside() {
        let root = PathBuf::from("/project");
        assert!(should_ignore(Path::new("/project/.git/HEAD"), &root, &[]));
        assert!(should_ignore(Path::new("/project/.angular/cache/x"), &root, &[]));
        assert!(should_ignore(Path::new("/elsewhere/app.ts"), &root, &[]));
    }

    #[test]
    fn test_classify_event_kinds() {
        let path = PathBuf::from("/project/src/app.ts");

        let event = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        assert_eq!(classify(&event), vec![FileChange::Created(path.clone())]);

        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.clone());
        assert_eq!(classify(&event), vec![FileChange::Modified(path.clone())]);

        let event = Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone());
        assert_eq!(classify(&event), vec![FileChange::Removed(path.clone())]);

        let event = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
            .add_path(path.clone());
        assert!(classify(&event).is_empty());
    }

    #[test]
    fn test_classify_rename() {
        let from = PathBuf::from("/project/src/old.ts");
        let to = PathBuf::from("/project/src/new.ts");
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(from.clone())
            .add_path(to.clone());
        assert_eq!(
            classify(&event),
            vec![FileChange::Removed(from), FileChange::Created(to)]
        );
    }

    #[tokio::test]
    async fn test_debounce_groups_changes() {
        let (change_tx, change_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(16);
        let task = tokio::spawn(debounce_changes(
            change_rx,
            Duration::from_millis(50),
            batch_tx,
        ));

        change_tx
            .send(FileChange::Modified(PathBuf::from("a.ts")))
            .await
            .unwrap();
        change_tx
            .send(FileChange::Created(PathBuf::from("b.ts")))
            .await
            .unwrap();
        change_tx
            .send(FileChange::Modified(PathBuf::from("a.ts")))
            .await
            .unwrap();

        let batch = batch_rx.recv().await.unwrap();
        assert_eq!(batch.modified, BTreeSet::from([PathBuf::from("a.ts")]));
        assert_eq!(batch.added, BTreeSet::from([PathBuf::from("b.ts")]));

        drop(change_tx);
        task.await.unwrap();
        assert!(batch_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_debounce_flushes_on_close() {
        let (change_tx, change_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(16);

        change_tx
            .send(FileChange::Removed(PathBuf::from("gone.ts")))
            .await
            .unwrap();
        drop(change_tx);

        debounce_changes(change_rx, Duration::from_secs(10), batch_tx).await;
        let batch = batch_rx.recv().await.unwrap();
        assert_eq!(batch.removed, BTreeSet::from([PathBuf::from("gone.ts")]));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = FileWatcher::spawn(PathBuf::from("/definitely/not/here"), vec![], 50);
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }
}
