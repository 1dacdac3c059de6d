//! Tracing setup: env-filtered, non-blocking, to stderr.
//!
//! Stdout carries JSON results only, so logs never interleave with them.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "KEYWARD_LOG";

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
#[must_use]
pub fn init(verbosity: u8) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .try_init();

    guard
}

fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("keyward={level},keyward_vault={level},keyward_crypto_core={level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_crate_levels() {
        assert!(default_directive(0).starts_with("keyward=warn"));
        assert!(default_directive(1).contains("keyward_vault=info"));
        assert!(default_directive(2).contains("keyward_crypto_core=debug"));
        assert!(default_directive(9).starts_with("keyward=trace"));
    }

    #[test]
    fn default_directive_parses() {
        for v in 0..4 {
            assert!(EnvFilter::try_new(default_directive(v)).is_ok());
        }
    }
}
