//! Bundling units and build pipeline shared by `serve` and `build`.

use crate::config::NgbuildConfig;
use crate::error::Result;
use ngbuild_core::{
    normalize_entries, BuildPipeline, BundleKind, BundlerContext, CommandContext, ConcatContext,
    IndexDocument,
};
use std::path::Path;

/// Create one context per bundling unit and the pipeline that publishes
/// their output.
///
/// The application command always comes first, followed by one context per
/// style bucket and per script bucket.
pub(crate) fn prepare(
    config: &NgbuildConfig,
    root: &Path,
) -> Result<(BuildPipeline, Vec<Box<dyn BundlerContext>>)> {
    let styles = normalize_entries(&config.styles, "styles")?;
    let scripts = normalize_entries(&config.scripts, "scripts")?;

    let mut contexts: Vec<Box<dyn BundlerContext>> = Vec::with_capacity(1 + styles.len() + scripts.len());
    contexts.push(Box::new(CommandContext::new(
        config.command.clone(),
        root,
        &config.output_path,
        config.clean,
    )?));

    let index = config
        .index
        .as_ref()
        .map(|source| IndexDocument::from_entries(source, &styles, &scripts));

    for entry in styles {
        contexts.push(Box::new(ConcatContext::new(entry, BundleKind::Style, root)));
    }
    for entry in scripts {
        contexts.push(Box::new(ConcatContext::new(entry, BundleKind::Script, root)));
    }

    tracing::debug!(
        units = contexts.len(),
        assets = config.assets.len(),
        index = index.is_some(),
        "prepared build pipeline"
    );

    let pipeline = BuildPipeline::new(root)
        .with_asset_patterns(config.assets.clone())
        .with_index(index);

    Ok((pipeline, contexts))
}
