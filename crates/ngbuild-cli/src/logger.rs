//! Logging setup for the ngbuild CLI.
//!
//! Builds a `tracing` subscriber with an `EnvFilter` and a compact formatter.
//! `RUST_LOG` is honoured unless `--verbose` or `--quiet` is given.
//!
//! ```rust,no_run
//! use ngbuild_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("starting dev server");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "ngbuild_core=debug,ngbuild_cli=debug,tower_http=debug";
const QUIET_FILTER: &str = "ngbuild_core=error,ngbuild_cli=error";
const DEFAULT_FILTER: &str = "ngbuild_core=info,ngbuild_cli=info";

/// Select the filter directives for the given flags.
///
/// `--verbose` wins over `--quiet`; without either flag `RUST_LOG` is used
/// when it parses, the default directives otherwise.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_filter_enables_debug() {
        let filter = filter_for(true, false);
        assert!(filter.to_string().contains("ngbuild_core=debug"));
    }

    #[test]
    fn test_verbose_overrides_quiet() {
        let filter = filter_for(true, true);
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_quiet_filter_is_errors_only() {
        let filter = filter_for(false, true);
        assert!(filter.to_string().contains("ngbuild_cli=error"));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(false, true, true);
    }
}
