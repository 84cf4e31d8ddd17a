//! Bundler contexts: one per independent bundling unit.
//!
//! A context produces the complete output set of its unit on every call to
//! [`BundlerContext::rebuild`]. Contexts live across rebuilds inside a
//! [`crate::RebuildState`] and are disposed when watching stops.

use crate::entries::NamedEntry;
use crate::error::{Error, Result};
use crate::registry::OutputFile;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;

/// Output of one context for one build pass.
#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
    pub files: Vec<OutputFile>,
    pub warnings: Vec<String>,
}

/// A live bundling unit.
#[async_trait]
pub trait BundlerContext: Send {
    /// Human-readable unit name used in logs.
    fn name(&self) -> &str;

    /// Produce the unit's complete output.
    async fn rebuild(&mut self) -> Result<BundleOutput>;

    /// Release anything held between rebuilds.
    async fn dispose(&mut self) {}
}

/// Application unit backed by an external build command.
///
/// The command is run through the platform shell in `cwd`. Everything it
/// leaves under `output_path` becomes the unit's output.
#[derive(Debug, Clone)]
pub struct CommandContext {
    command: String,
    cwd: PathBuf,
    output_path: PathBuf,
    clean: bool,
}

impl CommandContext {
    /// Create a context. `output_path` is resolved against `cwd`.
    ///
    /// # Errors
    ///
    /// Cleaning is refused when the output path is the workspace itself or
    /// lies outside it.
    pub fn new(
        command: impl Into<String>,
        cwd: impl Into<PathBuf>,
        output_path: impl AsRef<Path>,
        clean: bool,
    ) -> Result<Self> {
        let cwd = cwd.into();
        let output_path = cwd.join(output_path.as_ref());

        let escapes = output_path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if clean && (output_path == cwd || escapes || !output_path.starts_with(&cwd)) {
            return Err(Error::UnsafeOutputPath(output_path));
        }

        Ok(Self {
            command: command.into(),
            cwd,
            output_path,
            clean,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn shell(&self) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C");
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c");
            cmd
        };
        cmd.arg(&self.command).current_dir(&self.cwd).kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl BundlerContext for CommandContext {
    fn name(&self) -> &str {
        "application"
    }

    async fn rebuild(&mut self) -> Result<BundleOutput> {
        if self.clean && self.output_path.exists() {
            tokio::fs::remove_dir_all(&self.output_path)
                .await
                .map_err(|e| Error::io(&self.output_path, e))?;
        }

        let start = Instant::now();
        tracing::debug!(command = %self.command, "running build command");
        let output = self
            .shell()
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                command: self.command.clone(),
                status: None,
                stderr: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: self.command.clone(),
                status: output.status.code(),
                stderr,
            });
        }
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "build command finished"
        );

        let files = collect_output_dir(&self.output_path).await?;
        let warnings = if stderr.is_empty() {
            Vec::new()
        } else {
            vec![stderr]
        };
        Ok(BundleOutput { files, warnings })
    }
}

/// Read every file under `dir` into memory, keyed by its path relative to `dir`.
pub async fn collect_output_dir(dir: &Path) -> Result<Vec<OutputFile>> {
    let root = dir.to_path_buf();
    let paths = tokio::task::spawn_blocking(move || -> Result<Vec<(String, PathBuf)>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Walk {
                root: root.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&root) {
                let relative = relative.to_string_lossy().replace('\\', "/");
                paths.push((relative, entry.path().to_path_buf()));
            }
        }
        Ok(paths)
    })
    .await??;

    let mut files = Vec::with_capacity(paths.len());
    for (relative, absolute) in paths {
        let contents = tokio::fs::read(&absolute)
            .await
            .map_err(|e| Error::io(&absolute, e))?;
        files.push(OutputFile::new(relative, contents));
    }
    Ok(files)
}

/// Kind of global bundle a [`ConcatContext`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Style,
    Script,
}

impl BundleKind {
    pub fn extension(self) -> &'static str {
        match self {
            BundleKind::Style => "css",
            BundleKind::Script => "js",
        }
    }
}

/// Global style or script bucket: its inputs concatenated in order.
#[derive(Debug, Clone)]
pub struct ConcatContext {
    entry: NamedEntry,
    kind: BundleKind,
    cwd: PathBuf,
}

impl ConcatContext {
    pub fn new(entry: NamedEntry, kind: BundleKind, cwd: impl Into<PathBuf>) -> Self {
        Self {
            entry,
            kind,
            cwd: cwd.into(),
        }
    }

    pub fn entry(&self) -> &NamedEntry {
        &self.entry
    }

    /// Virtual path of the produced bundle.
    pub fn output_path(&self) -> String {
        format!("/{}.{}", self.entry.name, self.kind.extension())
    }
}

#[async_trait]
impl BundlerContext for ConcatContext {
    fn name(&self) -> &str {
        &self.entry.name
    }

    async fn rebuild(&mut self) -> Result<BundleOutput> {
        let mut contents = Vec::new();
        for input in &self.entry.inputs {
            let path = self.cwd.join(input);
            let bytes = tokio::fs::read(&path).await.map_err(|e| Error::io(&path, e))?;
            if !contents.is_empty() && !contents.ends_with(b"\n") {
                contents.push(b'\n');
            }
            contents.extend_from_slice(&bytes);
        }
        Ok(BundleOutput {
            files: vec![OutputFile::new(self.output_path(), contents)],
            warnings: Vec::new(),
        })
    }
}
