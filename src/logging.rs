//! Structured logging setup for the command-line tool.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT_LOGGING: Once = Once::new();

/// Fallback variable consulted when `RUST_LOG` is not set.
pub const LOG_LEVEL_ENV: &str = "IOU_TRACK_LOG";

/// Install a global fmt subscriber. Safe to call more than once.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".into())))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stdout_layer = fmt::layer().with_target(true).compact();

        // another subscriber may already be installed by an embedding application
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init();
    });
}
