//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_rules_total` (gauge): rules currently stored
//! - `router_rule_mutations_total` (counter): by `op` (create, update, delete)
//! - `router_rules_pruned_total` (counter): rules removed by pruning
//! - `router_resolutions_total` (counter): by `outcome` (matched, no_match)
//! - `router_http_requests_total` (counter): by `method`, `status`
//! - `router_http_request_duration_seconds` (histogram)
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rule_mutation(op: &'static str) {
    metrics::counter!("router_rule_mutations_total", "op" => op).increment(1);
}

pub fn record_rule_count(count: usize) {
    metrics::gauge!("router_rules_total").set(count as f64);
}

pub fn record_rules_pruned(count: usize) {
    metrics::counter!("router_rules_pruned_total").increment(count as u64);
}

pub fn record_resolution(outcome: &'static str) {
    metrics::counter!("router_resolutions_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "router_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("router_http_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
