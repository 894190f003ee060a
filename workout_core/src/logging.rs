//! Tracing setup for the runner and its shell.
//!
//! Log lines go to stderr so they never interleave with the workout screen
//! on stdout. `RUST_LOG` takes precedence over the default level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when `RUST_LOG` is unset; quiet enough for a live workout
const DEFAULT_LEVEL: &str = "warn";

pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Install the subscriber, falling back to `default_level` without `RUST_LOG`
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Debug-level subscriber routed through the test harness capture
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("workout_core=debug"))
        .try_init();
}
