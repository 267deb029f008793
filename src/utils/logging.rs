//! Logging Setup
//!
//! Installs the tracing subscriber used by the `meka` binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "meka_client=info,meka_core=info";
/// Filter used with `--verbose` when `RUST_LOG` is unset
pub const VERBOSE_LOG_FILTER: &str = "meka_client=debug,meka_core=debug";

/// Resolve the log filter: `RUST_LOG` wins, then the verbosity default.
pub fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    })
}

/// Initialize tracing with stderr output so stdout stays clean for results.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(log_filter(verbose)),
        )
        .try_init();
}
