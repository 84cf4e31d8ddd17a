//! # ngbuild-core
//!
//! Incremental output tracking for the ngbuild dev pipeline.
//!
//! Bundling is delegated to [`context::BundlerContext`] implementations. Every
//! build hands its complete output set to an [`registry::OutputFileRegistry`],
//! which diffs it against the previous build by size and BLAKE3 content hash.
//! The resulting `updated` flags drive [`reload::compute_reload_actions`], and
//! the registry plus the [`assets::AssetMap`] are what the dev server reads
//! when answering requests.
//!
//! ## Quick Start
//!
//! ```
//! use ngbuild_core::registry::{OutputFile, OutputFileRegistry};
//! use ngbuild_core::reload::compute_reload_actions;
//!
//! let mut registry = OutputFileRegistry::new();
//! registry.ingest(vec![OutputFile::new("main.js", "console.log(1)")]);
//! assert!(registry.get("/main.js").unwrap().updated);
//!
//! registry.ingest(vec![OutputFile::new("main.js", "console.log(1)")]);
//! let actions = compute_reload_actions(&registry);
//! assert!(actions.invalidate_paths.is_empty());
//! ```

pub mod assets;
pub mod context;
pub mod entries;
pub mod error;
pub mod hash;
pub mod index_html;
pub mod loader;
pub mod rebuild;
pub mod registry;
pub mod reload;
pub mod source_cache;
pub mod stream;

pub use assets::{AssetMap, AssetPattern};
pub use context::{BundleKind, BundleOutput, BundlerContext, CommandContext, ConcatContext};
pub use entries::{normalize_entries, EntryOption, NamedEntry};
pub use error::{Error, Result};
pub use hash::{hash_bytes, ContentHash};
pub use index_html::IndexDocument;
pub use loader::LoadOutcome;
pub use rebuild::RebuildState;
pub use registry::{IngestSummary, OutputFile, OutputFileRecord, OutputFileRegistry};
pub use reload::{compute_reload_actions, ModuleGraph, ReloadActions, ReloadStrategy};
pub use source_cache::SourceFileCache;
pub use stream::{
    BuildPipeline, BuildResult, BuildStream, ChangeBatch, SharedAssetMap, SharedRegistry,
};
