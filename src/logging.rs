//! Tracing initialization

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "AUTOARCH_LOG";

static INIT: Once = Once::new();

/// Initialize diagnostic logging to stderr.
///
/// Reads `AUTOARCH_LOG` for per-module levels, e.g.
/// `AUTOARCH_LOG=autoarch::archiving=debug,autoarch::archiver=trace`.
/// Falls back to `autoarch=warn` if unset or invalid.
///
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("autoarch=warn"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .without_time(),
            )
            .with(filter)
            .init();
    });
}
