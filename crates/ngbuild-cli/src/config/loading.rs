use crate::cli::{BuildArgs, ConfigArgs, ServeArgs};
use crate::config::NgbuildConfig;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    value::Uncased,
    Figment,
};
use ngbuild_core::LoadOutcome;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config files looked up in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["ngbuild.json", "ngbuild.toml"];

const ENV_PREFIX: &str = "NGBUILD_";

/// Values given on the command line. Only `Some` fields override.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serve_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_reload: Option<bool>,
}

impl From<&ServeArgs> for CliOverrides {
    fn from(args: &ServeArgs) -> Self {
        Self {
            command: args.config.build_command.clone(),
            host: args.host.clone(),
            port: args.port,
            serve_path: args.serve_path.clone(),
            live_reload: args.no_live_reload.then_some(false),
            ..Self::default()
        }
    }
}

impl From<&BuildArgs> for CliOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self {
            command: args.config.build_command.clone(),
            ..Self::default()
        }
    }
}

impl NgbuildConfig {
    /// Load and validate configuration for a command.
    ///
    /// Returns the config together with the working directory it was
    /// resolved against.
    pub fn from_args(args: &ConfigArgs, overrides: &CliOverrides) -> Result<(Self, PathBuf)> {
        let cwd = match &args.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        let config = Self::load(&cwd, args.config.as_deref(), overrides)?;
        Ok((config, cwd))
    }

    /// Load configuration from multiple sources.
    ///
    /// Priority: CLI overrides > `NGBUILD_*` environment variables > config file > defaults.
    /// Without an explicit `config_path`, `ngbuild.json` then `ngbuild.toml`
    /// are looked up in `cwd`.
    pub fn load(cwd: &Path, config_path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    cwd.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => discover_config_file(cwd),
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            let file = json_source(&path)
                .or_else(|| toml_source(&path))
                .loaded()
                .ok_or_else(|| ConfigError::UnsupportedFormat(path.clone()))?;
            figment = figment.merge(file);
        }

        figment = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| Uncased::new(env_key_to_field(key.as_str())))
                    .lowercase(false),
            )
            .merge(Serialized::defaults(overrides));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// First config file that exists in `cwd`.
pub fn discover_config_file(cwd: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| cwd.join(name))
        .find(|path| path.is_file())
}

/// Map an environment key (prefix already stripped) to a config field path.
///
/// `SERVE_PATH` becomes `servePath`; a double underscore nests, so
/// `WATCH__DEBOUNCE_MS` becomes `watch.debounceMs`.
pub fn env_key_to_field(key: &str) -> String {
    key.split("__")
        .map(|segment| {
            let mut field = String::with_capacity(segment.len());
            for (i, word) in segment.split('_').filter(|w| !w.is_empty()).enumerate() {
                let word = word.to_ascii_lowercase();
                if i == 0 {
                    field.push_str(&word);
                } else {
                    let mut chars = word.chars();
                    if let Some(first) = chars.next() {
                        field.push(first.to_ascii_uppercase());
                        field.push_str(chars.as_str());
                    }
                }
            }
            field
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn json_source(path: &Path) -> LoadOutcome<Figment> {
    if has_extension(path, "json") {
        LoadOutcome::Loaded(Figment::from(Json::file(path)))
    } else {
        LoadOutcome::RequiresAlternateFormat
    }
}

fn toml_source(path: &Path) -> LoadOutcome<Figment> {
    if has_extension(path, "toml") {
        LoadOutcome::Loaded(Figment::from(Toml::file(path)))
    } else {
        LoadOutcome::RequiresAlternateFormat
    }
}
