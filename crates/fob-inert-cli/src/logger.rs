//! Logging setup for the `fob-inert` binary.
//!
//! Library crates only emit `tracing` events; this is the single place a
//! subscriber gets installed.
//!
//! Level selection, in order:
//! 1. `--verbose`: debug for the inert crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. info for the inert crates

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "fob_inert=debug,fob_plugin_inert=debug,fob_inert_cli=debug";
const QUIET_FILTER: &str = "fob_inert=error,fob_plugin_inert=error,fob_inert_cli=error";
const DEFAULT_FILTER: &str = "fob_inert=info,fob_plugin_inert=info,fob_inert_cli=info";

/// Build the filter for the given flags. `verbose` wins over `quiet`.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_quiet() {
        let filter = filter_for(true, true);
        assert!(filter.to_string().contains("fob_inert=debug"));
    }

    #[test]
    fn test_quiet_filter_is_errors_only() {
        let filter = filter_for(false, true);
        assert!(filter.to_string().contains("fob_plugin_inert=error"));
    }

    #[test]
    fn test_repeated_init_does_not_panic() {
        init_logger(false, true, true);
        init_logger(false, true, true);
    }
}
