//! Development server command implementation.
//!
//! Orchestrates the dev session:
//! - Build stream producing the initial build and watch rebuilds
//! - File watching with debouncing
//! - HTTP server serving the in-memory output, with SSE live reload
//! - Graceful shutdown on Ctrl+C

use crate::cli::ServeArgs;
use crate::commands::pipeline;
use crate::config::{CliOverrides, NgbuildConfig};
use crate::dev::{DevEvent, DevServer, DevServerState, FileWatcher, ServeOptions, SharedState};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use ngbuild_core::{BuildResult, BuildStream, RebuildState, SourceFileCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Execute the serve command.
///
/// The server starts listening before the initial build finishes; requests
/// that arrive earlier see an empty registry. A failed build keeps the
/// previous output and watching continues, so errors can be fixed without a
/// restart.
///
/// # Errors
///
/// Returns errors for invalid configuration, an unavailable address, or a
/// watcher that cannot be started. Build failures are reported, not returned.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let (config, cwd) = NgbuildConfig::from_args(&args.config, &CliOverrides::from(&args))?;
    let root = config.workspace_root(&cwd);

    ui::info(&format!("Workspace: {}", root.display()));

    let (pipeline, contexts) = pipeline::prepare(&config, &root)?;
    let state: SharedState = Arc::new(DevServerState::new(
        pipeline.registry(),
        pipeline.asset_map(),
        ServeOptions::from_config(&config),
    ));

    let source_cache = SourceFileCache::acquire(root.clone());
    let (watcher, changes) =
        FileWatcher::spawn(root.clone(), watch_ignore(&config, &cwd), config.watch.debounce_ms)
            .context("Failed to watch the workspace")?;

    let server = DevServer::bind(&config.host, config.port, Arc::clone(&state)).await?;
    let addr = server.local_addr()?;
    let mut server_handle = tokio::spawn(server.run());

    ui::success(&format!(
        "Development server running at http://{}{}",
        addr, config.serve_path
    ));
    ui::info(&format!("Watching for changes in: {}", watcher.root().display()));
    ui::info("Building...");

    let mut stream = BuildStream::spawn(
        pipeline,
        RebuildState::new(contexts, Some(source_cache)),
        Some(changes),
    );

    let outcome = loop {
        tokio::select! {
            result = stream.recv() => match result {
                Some(result) => report(&state, result, config.live_reload).await,
                None => break Ok(()),
            },

            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                break Ok(());
            }

            res = &mut server_handle => {
                break match res {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(CliError::Server(format!("Server task failed: {e}"))),
                };
            }
        }
    };

    drop(watcher);
    stream.stop().await?;
    server_handle.abort();

    outcome
}

/// Configured ignore patterns plus the build command's output directory,
/// which would otherwise retrigger a build after every build.
fn watch_ignore(config: &NgbuildConfig, cwd: &std::path::Path) -> Vec<String> {
    let mut ignore = config.watch.ignore.clone();
    let root = config.workspace_root(cwd);
    if let Ok(output) = config.output_dir(cwd).strip_prefix(&root) {
        let output = output.to_string_lossy().replace('\\', "/");
        if !output.is_empty() && !ignore.contains(&output) {
            ignore.push(output);
        }
    }
    ignore
}

/// Publish a build result to the terminal and to connected browsers.
async fn report(state: &DevServerState, result: BuildResult, live_reload: bool) {
    for warning in &result.warnings {
        ui::warning(warning);
    }

    if !result.success {
        let error = result.errors.join("\n");
        ui::error(&format!("Build failed, still serving the previous output\n{error}"));
        state.fail_build(error.clone());
        state.broadcast(&DevEvent::BuildFailed { error }).await;
        return;
    }

    let duration = ui::format_duration(Duration::from_millis(result.duration_ms));
    match &result.summary {
        Some(summary) if summary.has_changes() => ui::success(&format!(
            "Build completed in {duration} ({} added, {} changed, {} removed)",
            summary.added.len(),
            summary.changed.len(),
            summary.removed.len()
        )),
        _ => ui::success(&format!("Build completed in {duration}, output unchanged")),
    }

    state.complete_build(result.duration_ms);
    state
        .broadcast(&DevEvent::BuildCompleted {
            duration_ms: result.duration_ms,
        })
        .await;

    if live_reload && result.should_reload() {
        let paths = result
            .reload
            .map(|reload| reload.invalidate_paths.into_iter().collect())
            .unwrap_or_default();
        state.broadcast(&DevEvent::Reload { paths }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngbuild_core::{IngestSummary, ReloadActions, SharedAssetMap, SharedRegistry};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn state() -> DevServerState {
        DevServerState::new(
            SharedRegistry::default(),
            SharedAssetMap::default(),
            ServeOptions::default(),
        )
    }

    fn changed_build() -> BuildResult {
        BuildResult {
            success: true,
            duration_ms: 42,
            summary: Some(IngestSummary {
                changed: vec!["/main.js".to_string()],
                ..IngestSummary::default()
            }),
            reload: Some(ReloadActions {
                invalidate_paths: BTreeSet::from(["/main.js".to_string()]),
                full_reload: true,
            }),
            ..BuildResult::default()
        }
    }

    #[test]
    fn test_watch_ignore_adds_output_dir() {
        let config = NgbuildConfig::default();
        let ignore = watch_ignore(&config, &PathBuf::from("/workspace"));
        assert!(ignore.contains(&"dist".to_string()));
        assert!(ignore.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_watch_ignore_skips_output_outside_root() {
        let config = NgbuildConfig {
            output_path: PathBuf::from("/tmp/out"),
            ..NgbuildConfig::default()
        };
        let ignore = watch_ignore(&config, &PathBuf::from("/workspace"));
        assert_eq!(ignore, config.watch.ignore);
    }

    #[tokio::test]
    async fn test_report_success_broadcasts_reload() {
        let state = state();
        let (_id, mut rx) = state.register_client();

        report(&state, changed_build(), true).await;

        assert!(state.status().is_success());
        assert!(rx.recv().await.unwrap().contains("BuildCompleted"));
        let reload = rx.recv().await.unwrap();
        assert_eq!(reload, r#"{"type":"Reload","paths":["/main.js"]}"#);
    }

    #[tokio::test]
    async fn test_report_without_live_reload() {
        let state = state();
        let (_id, mut rx) = state.register_client();

        report(&state, changed_build(), false).await;

        assert!(rx.recv().await.unwrap().contains("BuildCompleted"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_report_failure_keeps_serving() {
        let state = state();
        let (_id, mut rx) = state.register_client();

        let result = BuildResult {
            success: false,
            errors: vec!["error TS2322".to_string()],
            ..BuildResult::default()
        };
        report(&state, result, true).await;

        assert_eq!(state.status().error(), Some("error TS2322"));
        assert!(rx.recv().await.unwrap().contains("BuildFailed"));
    }
}
