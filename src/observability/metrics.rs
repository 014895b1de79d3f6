//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_side_calls_total` (counter): side calls by outcome
//! - `relay_side_call_duration_seconds` (histogram): side call latency
//! - `relay_cookies_relayed_total` (counter): `Set-Cookie` headers relayed
//! - `relay_skipped_total` (counter): requests that made no side call, by reason
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished side call. `outcome` is `ok` or an error kind.
pub fn record_side_call(outcome: &'static str, start: Instant) {
    counter!("relay_side_calls_total", "outcome" => outcome).increment(1);
    histogram!("relay_side_call_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_relayed(count: usize) {
    counter!("relay_cookies_relayed_total").increment(count as u64);
}

pub fn record_skipped(reason: &'static str) {
    counter!("relay_skipped_total", "reason" => reason).increment(1);
}
