//! Static asset map: virtual served path -> real file on disk.
//!
//! Unlike build output, assets are never loaded into memory. The map is small
//! and rebuilt wholesale on every build; the dev server reads the source file
//! when a request arrives.

use crate::error::{Error, Result};
use crate::registry::normalize_virtual_path;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One asset copy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetPattern {
    /// Directory to search, relative to the workspace root
    pub input: PathBuf,
    /// Glob selecting files below `input`
    #[serde(default = "default_glob")]
    pub glob: String,
    /// Served directory prefix
    #[serde(default)]
    pub output: String,
    /// Globs excluded from the match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

fn default_glob() -> String {
    "**/*".to_string()
}

impl AssetPattern {
    /// Shorthand for "serve everything under `input` at `output`".
    pub fn dir(input: impl Into<PathBuf>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            glob: default_glob(),
            output: output.into(),
            ignore: Vec::new(),
        }
    }
}

/// Mapping from virtual served path to real source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMap {
    entries: BTreeMap<String, PathBuf>,
}

impl AssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every pattern below `root` and map matching files.
    ///
    /// Later patterns win when two map the same served path.
    pub fn collect(root: &Path, patterns: &[AssetPattern]) -> Result<Self> {
        let mut map = Self::new();

        for pattern in patterns {
            let input = root.join(&pattern.input);
            if !input.is_dir() {
                tracing::warn!(input = %input.display(), "asset input directory does not exist");
                continue;
            }

            let mut overrides = OverrideBuilder::new(&input);
            overrides.add(&pattern.glob).map_err(|e| walk_error(&input, e))?;
            for ignored in &pattern.ignore {
                overrides
                    .add(&format!("!{ignored}"))
                    .map_err(|e| walk_error(&input, e))?;
            }
            let overrides = overrides.build().map_err(|e| walk_error(&input, e))?;

            let walker = WalkBuilder::new(&input)
                .standard_filters(false)
                .overrides(overrides)
                .build();

            for entry in walker {
                let entry = entry.map_err(|e| walk_error(&input, e))?;
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(&input) else {
                    continue;
                };
                let served = served_path(&pattern.output, relative);
                map.insert(served, entry.path().to_path_buf());
            }
        }

        tracing::debug!(assets = map.len(), "collected asset map");
        Ok(map)
    }

    pub fn insert(&mut self, served_path: impl AsRef<str>, source: PathBuf) {
        self.entries
            .insert(normalize_virtual_path(served_path.as_ref()), source);
    }

    /// Replace the whole map with `other`.
    pub fn replace(&mut self, other: AssetMap) {
        self.entries = other.entries;
    }

    pub fn get(&self, served_path: &str) -> Option<&Path> {
        self.entries.get(served_path).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(served, source)| (served.as_str(), source.as_path()))
    }
}

fn served_path(output: &str, relative: &Path) -> String {
    let relative = relative.to_string_lossy().replace('\\', "/");
    let output = output.trim_matches('/');
    if output.is_empty() {
        format!("/{relative}")
    } else {
        format!("/{output}/{relative}")
    }
}

fn walk_error(root: &Path, err: ignore::Error) -> Error {
    Error::Walk {
        root: root.to_path_buf(),
        message: err.to_string(),
    }
}
