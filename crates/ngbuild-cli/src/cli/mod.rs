//! Command-line interface definition.
//!
//! - `ngbuild serve` - Build, watch, and serve the output from memory
//! - `ngbuild build` - Build once and write the output to disk
//! - `ngbuild schema` - Print the JSON schema of the configuration file

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, ConfigArgs, SchemaArgs, ServeArgs};

/// ngbuild - in-memory dev server and build runner
#[derive(Parser, Debug)]
#[command(
    name = "ngbuild",
    version,
    about = "In-memory dev server and build runner for Angular-style applications",
    long_about = "ngbuild runs your build command plus global style and script bundles,\n\
                  keeps the complete output in memory, and reloads connected browsers\n\
                  only when the output actually changed."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "ngbuild",
            "serve",
            "--port",
            "4300",
            "--serve-path",
            "/app/",
            "--no-live-reload",
            "--cwd",
            "/project",
        ])
        .unwrap();

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(4300));
        assert_eq!(args.serve_path.as_deref(), Some("/app/"));
        assert!(args.no_live_reload);
        assert_eq!(args.config.cwd, Some(PathBuf::from("/project")));
    }

    #[test]
    fn test_build_flags() {
        let cli = Cli::try_parse_from(["ngbuild", "--quiet", "build", "--out-dir", "out"]).unwrap();
        assert!(cli.quiet);
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.out_dir, Some(PathBuf::from("out")));
        assert!(args.config.config.is_none());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["ngbuild", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_port_must_be_a_number() {
        assert!(Cli::try_parse_from(["ngbuild", "serve", "--port", "http"]).is_err());
    }
}
