use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server with watch mode
    ///
    /// Runs the build, keeps its output in memory, serves it over HTTP and
    /// reloads connected browsers when a rebuild changes the output.
    Serve(ServeArgs),

    /// Build once and write the output to disk
    Build(BuildArgs),

    /// Print the JSON schema for ngbuild.json
    Schema(SchemaArgs),
}

/// Options shared by every command that loads configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the config file (ngbuild.json or ngbuild.toml)
    ///
    /// Defaults to ngbuild.json, then ngbuild.toml, in the working directory.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Working directory (workspace root)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Build command for the application, overriding `command` in the config
    #[arg(long = "command", value_name = "CMD")]
    pub build_command: Option<String>,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Host to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Base path the application is served under
    #[arg(long, value_name = "PATH")]
    pub serve_path: Option<String>,

    /// Do not inject the live-reload client or broadcast reloads
    #[arg(long)]
    pub no_live_reload: bool,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Directory the collected output is written to
    ///
    /// Defaults to the configured output path.
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for the schema command
#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Write the schema to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
