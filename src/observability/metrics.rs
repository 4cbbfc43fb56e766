//! Metrics collection and exposition.
//!
//! # Metrics
//! - `route_requests_total` (counter): dispatched requests by route kind, status
//! - `route_dispatch_duration_seconds` (histogram): dispatch latency
//! - `route_misses_total` (counter): lookups that found no route, by reason
//! - `route_compile_total` (counter): compiler runs
//! - `route_compiled_routes` (gauge): routes in the last compiled tree
//! - `route_compile_errors_total` (counter): recovered scan/parse errors
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Labels stay low-cardinality (never the raw path)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::routing::compiler::CompileReport;
use crate::routing::matcher::Miss;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

/// Record one dispatched request.
pub fn record_dispatch(kind: &'static str, status: u16, start: Instant) {
    counter!(
        "route_requests_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("route_dispatch_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// Record a lookup that matched nothing.
pub fn record_miss(miss: &Miss) {
    let reason = match miss {
        Miss::NoRoute => "no_route",
        Miss::NoHandler => "no_handler",
        Miss::Invalid(_) => "invalid_param",
    };
    counter!("route_misses_total", "reason" => reason).increment(1);
}

/// Record the outcome of a compiler run.
pub fn record_compile(report: &CompileReport) {
    counter!("route_compile_total").increment(1);
    gauge!("route_compiled_routes").set(report.routes as f64);
    counter!("route_compile_errors_total")
        .increment((report.scan_errors.len() + report.parse_errors.len()) as u64);
}
