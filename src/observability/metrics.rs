//! Metrics collection and exposition.
//!
//! # Metrics
//! - `static_gate_auth_decisions_total` (counter): decisions by outcome
//! - `static_gate_connections_total` (counter): accepted connections
//! - `static_gate_active_connections` (gauge): current connection count

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// `outcome` is `allow` or a deny reason label.
pub fn record_auth_decision(outcome: &'static str) {
    ::metrics::counter!("static_gate_auth_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_connection_opened(active: u64) {
    ::metrics::counter!("static_gate_connections_total").increment(1);
    ::metrics::gauge!("static_gate_active_connections").set(active as f64);
}

pub fn record_connection_closed(active: u64) {
    ::metrics::gauge!("static_gate_active_connections").set(active as f64);
}
