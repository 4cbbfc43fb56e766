//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: a bad config or a bad metrics address is reported before
//!   any route is compiled
//! - Logging comes up first so config problems are logged

use std::net::SocketAddr;

use crate::config::ObservabilityConfig;
use crate::observability::{logging, metrics};

/// Bring up logging and, when enabled, the metrics endpoint.
pub fn init_observability(config: &ObservabilityConfig) {
    logging::init(&config.log_level);

    if config.metrics_enabled {
        match config.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}
