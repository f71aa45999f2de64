//! Metrics collection and exposition.
//!
//! # Metrics
//! - `revproxy_requests_total` (counter): requests by backend and outcome
//! - `revproxy_request_duration_seconds` (histogram): time to response head
//! - `revproxy_backend_in_flight` (gauge): held admission slots per backend
//! - `revproxy_connections_active` (gauge): accepted client connections
//!
//! Without an installed recorder every call here is a no-op, so the core
//! records unconditionally and the diagnostics endpoint stays optional.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Label used for requests that matched no backend.
pub const UNKNOWN_BACKEND: &str = "unknown";

/// Serve the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Diagnostics endpoint listening");
    Ok(())
}

/// Record one finished dispatch decision.
pub fn record_request(backend: &str, outcome: &'static str, started: Instant) {
    ::metrics::counter!(
        "revproxy_requests_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(
        "revproxy_request_duration_seconds",
        "backend" => backend.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn backend_slot_acquired(backend: &str) {
    ::metrics::gauge!("revproxy_backend_in_flight", "backend" => backend.to_string())
        .increment(1.0);
}

pub fn backend_slot_released(backend: &str) {
    ::metrics::gauge!("revproxy_backend_in_flight", "backend" => backend.to_string())
        .decrement(1.0);
}

pub fn connection_opened() {
    ::metrics::gauge!("revproxy_connections_active").increment(1.0);
}

pub fn connection_closed() {
    ::metrics::gauge!("revproxy_connections_active").decrement(1.0);
}
