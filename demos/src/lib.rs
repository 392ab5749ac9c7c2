//! Shared setup for the demo binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load `.env` and log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init() {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
