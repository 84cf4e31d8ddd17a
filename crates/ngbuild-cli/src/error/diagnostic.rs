//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a pipeline error to a miette Report with a help line where one applies.
pub fn build_error_to_miette(err: ngbuild_core::Error) -> Report {
    match err {
        ngbuild_core::Error::CommandFailed {
            command,
            status,
            stderr,
        } => {
            let code = status.map(|c| format!(" (exit code {c})")).unwrap_or_default();
            miette::miette!(
                help = "Run the command by hand in the workspace root to see its full output",
                "Build command `{}` failed{}\n\n{}",
                command,
                code,
                stderr
            )
        }
        ngbuild_core::Error::InvalidEntry { name, reason } => miette::miette!(
            help = "Check the `styles` and `scripts` entries in your config",
            "Invalid entry '{}': {}",
            name,
            reason
        ),
        ngbuild_core::Error::UnsafeOutputPath(path) => miette::miette!(
            help = "Point `outputPath` at a directory inside the workspace, or disable `clean`",
            "Refusing to clean {}",
            path.display()
        ),
        ngbuild_core::Error::DuplicateOutput {
            path,
            first,
            second,
        } => miette::miette!(
            help = "Rename the style or script bundle, or stop the build command from emitting that file",
            "Output path {} is produced by both '{}' and '{}'",
            path,
            first,
            second
        ),
        other => miette::miette!("{}", other),
    }
}
