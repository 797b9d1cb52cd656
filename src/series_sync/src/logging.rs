//! Subscriber setup for the `series-sync` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. `RUST_LOG` wins over the built-in `info` default.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global subscriber. Output goes to stderr so stdout stays free
/// for command output. Calling this twice is harmless.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
}
