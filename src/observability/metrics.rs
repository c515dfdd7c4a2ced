//! Metrics collection and exposition.
//!
//! # Metrics
//! - `charity_rpc_calls_total` (counter): provider calls by method and outcome
//! - `charity_writes_total` (counter): contract writes by operation and final state
//! - `charity_writes_pending` (gauge): writes submitted but not yet resolved
//! - `charity_session_events_total` (counter): session lifecycle events by kind
//! - `charity_rate_refresh_total` (counter): exchange rate refreshes by origin
//! - `charity_campaign_fetch_skipped_total` (counter): campaigns skipped during fan-out

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_call(method: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("charity_rpc_calls_total", "method" => method, "outcome" => outcome).increment(1);
}

pub fn record_write(operation: &'static str, state: &'static str) {
    counter!("charity_writes_total", "operation" => operation, "state" => state).increment(1);
}

pub fn record_pending_writes(count: usize) {
    gauge!("charity_writes_pending").set(count as f64);
}

pub fn record_session_event(kind: &'static str) {
    counter!("charity_session_events_total", "kind" => kind).increment(1);
}

pub fn record_rate_refresh(origin: &'static str) {
    counter!("charity_rate_refresh_total", "origin" => origin).increment(1);
}

pub fn record_campaign_skipped() {
    counter!("charity_campaign_fetch_skipped_total").increment(1);
}
