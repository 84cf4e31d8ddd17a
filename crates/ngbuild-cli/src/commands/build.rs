//! Build command implementation.
//!
//! Runs every bundling unit once through the same pipeline the dev server
//! uses, then writes the collected output and static assets to disk.

use crate::cli::BuildArgs;
use crate::commands::pipeline;
use crate::config::{CliOverrides, NgbuildConfig};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use ngbuild_core::{BuildStream, RebuildState, SharedAssetMap, SharedRegistry};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Execute the build command.
///
/// # Errors
///
/// Returns errors for invalid configuration, a failed build, or output that
/// cannot be written.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let (config, cwd) = NgbuildConfig::from_args(&args.config, &CliOverrides::from(&args))?;
    let root = config.workspace_root(&cwd);
    let out_dir = match &args.out_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => cwd.join(dir),
        None => config.output_dir(&cwd),
    };

    ui::info(&format!("Running `{}` in {}", config.command, root.display()));

    let (pipeline, contexts) = pipeline::prepare(&config, &root)?;
    let registry = pipeline.registry();
    let assets = pipeline.asset_map();

    let mut stream = BuildStream::spawn(pipeline, RebuildState::new(contexts, None), None);
    let result = stream.recv().await;
    stream.stop().await?;

    let result = result.ok_or_else(|| CliError::BuildFailed("build was cancelled".to_string()))?;
    for warning in &result.warnings {
        ui::warning(warning);
    }
    if !result.success {
        return Err(CliError::BuildFailed(result.errors.join("\n")));
    }

    let written = write_output(&registry, &out_dir)
        .await
        .with_hint("Check that --out-dir points at a writable directory")?;
    let copied = copy_assets(&assets, &out_dir).await?;
    tracing::debug!(written, copied, out_dir = %out_dir.display(), "output written");

    let mut entries: Vec<(String, u64)> = registry
        .read()
        .iter()
        .map(|(path, record)| (path.to_string(), record.contents.len() as u64))
        .collect();
    entries.sort();

    ui::success(&format!("Wrote output to {}", out_dir.display()));
    ui::print_output_summary(&entries, Duration::from_millis(result.duration_ms));
    Ok(())
}

/// Write a snapshot of the registry to `out_dir` on the blocking pool.
async fn write_output(registry: &SharedRegistry, out_dir: &Path) -> Result<usize> {
    let snapshot = registry.read().clone();
    let out_dir = out_dir.to_path_buf();
    let written = tokio::task::spawn_blocking(move || snapshot.write_to_dir(&out_dir))
        .await
        .map_err(ngbuild_core::Error::from)??;
    Ok(written)
}

/// Copy every mapped asset from its source location into `out_dir`.
async fn copy_assets(assets: &SharedAssetMap, out_dir: &Path) -> Result<usize> {
    let pairs: Vec<(PathBuf, PathBuf)> = assets
        .read()
        .iter()
        .map(|(served, source)| {
            (
                out_dir.join(served.trim_start_matches('/')),
                source.to_path_buf(),
            )
        })
        .collect();

    for (target, source) in &pairs {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.with_path(parent)?;
        }
        tokio::fs::copy(source, target).await.with_path(source)?;
    }
    Ok(pairs.len())
}
