//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_config_requests_total` (counter): requests by method, route, status
//! - `site_config_request_duration_seconds` (histogram): latency distribution
//! - `site_config_writes_total` (counter): `PUT /config` outcomes
//! - `site_config_signatures_total` (counter): signing outcomes
//! - `site_config_publish_total` (counter): client publish outcomes
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("site_config_requests_total", &labels).increment(1);
    histogram!("site_config_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_write(outcome: &'static str) {
    counter!("site_config_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_signature(outcome: &'static str) {
    counter!("site_config_signatures_total", "outcome" => outcome).increment(1);
}

pub fn record_publish(outcome: &'static str) {
    counter!("site_config_publish_total", "outcome" => outcome).increment(1);
}
