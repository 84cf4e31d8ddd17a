//! Build stream lifecycle: initial build, rebuilds on change batches,
//! failure handling and deterministic teardown.

use async_trait::async_trait;
use ngbuild_core::{
    BuildPipeline, BuildStream, BundleOutput, BundlerContext, ChangeBatch, Error, OutputFile,
    RebuildState, Result, SourceFileCache,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

/// Context that replays a scripted sequence of outputs.
struct Scripted {
    builds: Arc<Mutex<VecDeque<Result<Vec<OutputFile>>>>>,
    disposed: Arc<AtomicBool>,
}

#[async_trait]
impl BundlerContext for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn rebuild(&mut self) -> Result<BundleOutput> {
        let next = self
            .builds
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        next.map(|files| BundleOutput {
            files,
            warnings: Vec::new(),
        })
    }

    async fn dispose(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

fn scripted(builds: Vec<Result<Vec<OutputFile>>>) -> (Box<dyn BundlerContext>, Arc<AtomicBool>) {
    let disposed = Arc::new(AtomicBool::new(false));
    let ctx = Scripted {
        builds: Arc::new(Mutex::new(builds.into())),
        disposed: Arc::clone(&disposed),
    };
    (Box::new(ctx), disposed)
}

fn touched(path: &str) -> ChangeBatch {
    ChangeBatch {
        modified: BTreeSet::from([PathBuf::from(path)]),
        ..ChangeBatch::default()
    }
}

fn failure() -> Error {
    Error::CommandFailed {
        command: "ng-build".to_string(),
        status: Some(1),
        stderr: "TS2322".to_string(),
    }
}

#[tokio::test]
async fn one_shot_stream_yields_initial_result_then_ends() {
    let (ctx, disposed) = scripted(vec![Ok(vec![OutputFile::new("main.js", "1")])]);
    let pipeline = BuildPipeline::new(".");
    let registry = pipeline.registry();

    let mut stream = BuildStream::spawn(pipeline, RebuildState::new(vec![ctx], None), None);
    let first = stream.recv().await.expect("initial result");
    assert!(first.success);
    assert!(first.should_reload());
    assert!(stream.recv().await.is_none());

    stream.stop().await.unwrap();
    assert!(disposed.load(Ordering::SeqCst));
    assert!(registry.read().contains("/main.js"));
}

#[tokio::test]
async fn rebuilds_follow_change_batches() {
    let (ctx, disposed) = scripted(vec![
        Ok(vec![OutputFile::new("main.js", "console.log(1)")]),
        Ok(vec![OutputFile::new("main.js", "console.log(1)")]),
        Ok(vec![OutputFile::new("main.js", "console.log(2)")]),
    ]);
    let pipeline = BuildPipeline::new(".");
    let registry = pipeline.registry();
    let (tx, rx) = mpsc::channel(8);

    let mut stream = BuildStream::spawn(pipeline, RebuildState::new(vec![ctx], None), Some(rx));
    assert!(stream.recv().await.unwrap().success);

    tx.send(touched("src/app.ts")).await.unwrap();
    let unchanged = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap();
    assert!(unchanged.success);
    assert!(!unchanged.should_reload());

    tx.send(touched("src/app.ts")).await.unwrap();
    let changed = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap();
    assert!(changed.should_reload());
    assert_eq!(
        changed.reload.unwrap().invalidate_paths,
        BTreeSet::from(["/main.js".to_string()])
    );
    assert_eq!(registry.read().get("/main.js").unwrap().contents, b"console.log(2)");

    stream.stop().await.unwrap();
    assert!(disposed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failed_build_keeps_previous_output() {
    let (ctx, _) = scripted(vec![
        Ok(vec![OutputFile::new("main.js", "good")]),
        Err(failure()),
    ]);
    let pipeline = BuildPipeline::new(".");
    let registry = pipeline.registry();
    let (tx, rx) = mpsc::channel(8);

    let mut stream = BuildStream::spawn(pipeline, RebuildState::new(vec![ctx], None), Some(rx));
    stream.recv().await.unwrap();

    tx.send(touched("src/app.ts")).await.unwrap();
    let failed = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap();
    assert!(!failed.success);
    assert!(!failed.should_reload());
    assert!(failed.errors[0].contains("TS2322"));

    let registry = registry.read();
    assert_eq!(registry.get("/main.js").unwrap().contents, b"good");
    drop(registry);

    stream.stop().await.unwrap();
}

#[tokio::test]
async fn unchanged_sources_skip_rebuild() {
    let temp = tempfile::TempDir::new().unwrap();
    let source = temp.path().join("app.ts");
    std::fs::write(&source, "export {}").unwrap();

    let cache = SourceFileCache::acquire(temp.path());
    cache.prime([source.clone()]).await;

    let (ctx, _) = scripted(vec![
        Ok(vec![OutputFile::new("main.js", "1")]),
        Ok(vec![OutputFile::new("main.js", "2")]),
    ]);
    let (tx, rx) = mpsc::channel(8);
    let mut stream = BuildStream::spawn(
        BuildPipeline::new(temp.path()),
        RebuildState::new(vec![ctx], Some(Arc::clone(&cache))),
        Some(rx),
    );
    stream.recv().await.unwrap();

    tx.send(touched(source.to_str().unwrap())).await.unwrap();
    assert!(timeout(Duration::from_millis(300), stream.recv()).await.is_err());

    std::fs::write(&source, "export const x = 1;").unwrap();
    tx.send(touched(source.to_str().unwrap())).await.unwrap();
    let rebuilt = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap();
    assert!(rebuilt.should_reload());

    stream.stop().await.unwrap();
    assert!(!cache.is_active());
}

#[tokio::test]
async fn identical_save_after_failed_build_retries() {
    let temp = tempfile::TempDir::new().unwrap();
    let source = temp.path().join("app.ts");
    std::fs::write(&source, "export {}").unwrap();

    let cache = SourceFileCache::acquire(temp.path());
    cache.prime([source.clone()]).await;

    let (ctx, _) = scripted(vec![
        Ok(vec![OutputFile::new("main.js", "1")]),
        Err(failure()),
        Ok(vec![OutputFile::new("main.js", "2")]),
    ]);
    let (tx, rx) = mpsc::channel(8);
    let mut stream = BuildStream::spawn(
        BuildPipeline::new(temp.path()),
        RebuildState::new(vec![ctx], Some(Arc::clone(&cache))),
        Some(rx),
    );
    assert!(stream.recv().await.unwrap().success);

    std::fs::write(&source, "export const x = 1;").unwrap();
    tx.send(touched(source.to_str().unwrap())).await.unwrap();
    let failed = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap();
    assert!(!failed.success);

    // Same bytes as the failed attempt.
    tx.send(touched(source.to_str().unwrap())).await.unwrap();
    let retried = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap();
    assert!(retried.success);
    assert!(retried.should_reload());

    // Once the build succeeded, identical saves are skipped again.
    tx.send(touched(source.to_str().unwrap())).await.unwrap();
    assert!(timeout(Duration::from_millis(300), stream.recv()).await.is_err());

    stream.stop().await.unwrap();
}

#[tokio::test]
async fn default_document_is_injected_before_ingest() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("index.html"),
        "<html><head></head><body></body></html>",
    )
    .unwrap();

    let (ctx, _) = scripted(vec![Ok(vec![OutputFile::new("main.js", "1")])]);
    let pipeline = BuildPipeline::new(temp.path()).with_index(Some(ngbuild_core::IndexDocument {
        source: PathBuf::from("index.html"),
        stylesheets: vec!["/styles.css".to_string()],
        scripts: vec![],
    }));
    let registry = pipeline.registry();

    let mut stream = BuildStream::spawn(pipeline, RebuildState::new(vec![ctx], None), None);
    assert!(stream.recv().await.unwrap().success);
    stream.stop().await.unwrap();

    let registry = registry.read();
    let index = registry.get("/index.html").expect("default document");
    assert!(String::from_utf8_lossy(&index.contents).contains("/styles.css"));
}
