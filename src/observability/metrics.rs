//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by route, method, status
//! - `relay_request_duration_seconds` (histogram): time from routing to response, by route
//! - `relay_upstream_duration_seconds` (histogram): time spent on calls that reached the upstream
//!
//! Recording is a no-op until a recorder is installed, so handlers can call
//! these unconditionally.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one request handled by a forwarding route.
pub fn record_request(route: &'static str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "route" => route,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream call, successful or not, measured from just before `send`.
pub fn record_upstream(start: Instant) {
    metrics::histogram!("relay_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}
