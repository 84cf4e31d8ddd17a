//! Configuration with multi-source loading.
//!
//! Priority: CLI > Environment (`NGBUILD_*`) > File (`ngbuild.json` / `ngbuild.toml`) > Defaults

mod loading;
mod validation;

pub use loading::{discover_config_file, env_key_to_field, CliOverrides, CONFIG_FILE_NAMES};

use ngbuild_core::{AssetPattern, EntryOption};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// ngbuild configuration - loaded from ngbuild.json, the environment and CLI args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NgbuildConfig {
    /// Editor schema reference, ignored by ngbuild
    #[serde(default, rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Shell command that builds the application into `outputPath`
    #[serde(default = "default_command")]
    pub command: String,

    /// Directory the build command writes to, relative to `root`
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Remove `outputPath` before every build
    #[serde(default)]
    pub clean: bool,

    /// Workspace root, relative to the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Source document used when the build does not emit index.html itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,

    /// Global stylesheets, bundled per bucket into `<name>.css`
    #[serde(default)]
    pub styles: Vec<EntryOption>,

    /// Global scripts, bundled per bucket into `<name>.js`
    #[serde(default)]
    pub scripts: Vec<EntryOption>,

    /// Static assets served from their source location
    #[serde(default)]
    pub assets: Vec<AssetPattern>,

    /// Host the dev server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the dev server binds to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base path the application is served under
    #[serde(default = "default_serve_path")]
    pub serve_path: String,

    /// Extra headers added to every dev server response
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Inject the reload client and reload browsers after changed builds
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,

    /// File watching
    #[serde(default)]
    pub watch: WatchConfig,
}

/// File watcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Paths or `*.ext` patterns ignored by the watcher
    #[serde(default = "default_watch_ignore")]
    pub ignore: Vec<String>,

    /// Quiet period before a batch of changes triggers a rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore: default_watch_ignore(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

pub fn default_command() -> String {
    "ng build".to_string()
}

pub fn default_output_path() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    4200
}

pub fn default_serve_path() -> String {
    "/".to_string()
}

pub fn default_live_reload() -> bool {
    true
}

pub fn default_watch_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".angular".to_string(),
        "*.log".to_string(),
    ]
}

pub fn default_debounce_ms() -> u64 {
    100
}

impl Default for NgbuildConfig {
    fn default() -> Self {
        Self {
            schema: None,
            command: default_command(),
            output_path: default_output_path(),
            clean: false,
            root: None,
            index: None,
            styles: Vec::new(),
            scripts: Vec::new(),
            assets: Vec::new(),
            host: default_host(),
            port: default_port(),
            serve_path: default_serve_path(),
            headers: BTreeMap::new(),
            live_reload: default_live_reload(),
            watch: WatchConfig::default(),
        }
    }
}

impl NgbuildConfig {
    /// Workspace root: `root` resolved against `cwd`.
    pub fn workspace_root(&self, cwd: &Path) -> PathBuf {
        match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        }
    }

    /// Output directory resolved against the workspace root.
    pub fn output_dir(&self, cwd: &Path) -> PathBuf {
        let root = self.workspace_root(cwd);
        if self.output_path.is_absolute() {
            self.output_path.clone()
        } else {
            root.join(&self.output_path)
        }
    }

    /// `http://host:port/servePath`
    pub fn server_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.serve_path)
    }

    /// JSON schema for the config file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(NgbuildConfig)).unwrap_or_default()
    }
}
