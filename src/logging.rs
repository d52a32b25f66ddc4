//! Logging initialization.
//!
//! Logs go to stderr so they never mix with pattern output on stdout.

use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive that overrides `-v`.
pub const LOG_ENV: &str = "AXON_LOG";

/// Default filter for a `-v` count.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbose)))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(verbose: u8) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .try_init()
        .is_ok();

    if installed {
        debug!("axon started with verbosity level: {}", verbose);
        trace!("full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    }
}
