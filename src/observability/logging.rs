//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level
//! - Initialization is idempotent so tests and the CLI can both call it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor config provide one.
pub const DEFAULT_FILTER: &str = "route_compiler=info,tower_http=debug";

/// Build the filter directive for a configured level.
pub fn filter_for(level: &str) -> String {
    if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else {
        format!("route_compiler={},tower_http=debug", level)
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level).into());

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if result.is_ok() {
        tracing::debug!(level, "Logging initialized");
    }
}
