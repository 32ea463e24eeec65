//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, downstream calls, workers, timeouts)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by mode, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency by mode
//! - `gateway_downstream_calls_total` (counter): worker calls by outcome
//! - `gateway_downstream_duration_seconds` (histogram): worker call latency
//! - `gateway_queue_wait_seconds` (histogram): time an envelope sat queued
//! - `gateway_active_workers` (gauge): live destination workers
//! - `gateway_workers_spawned_total` (counter)
//! - `gateway_dispatch_timeouts_total` (counter)
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: no destination label

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(mode: &'static str, status: u16, elapsed: Duration) {
    counter!("gateway_requests_total", "mode" => mode, "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds", "mode" => mode).record(elapsed.as_secs_f64());
}

pub fn record_downstream_call(outcome: &'static str, elapsed: Duration) {
    counter!("gateway_downstream_calls_total", "outcome" => outcome).increment(1);
    histogram!("gateway_downstream_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_queue_wait(waited: Duration) {
    histogram!("gateway_queue_wait_seconds").record(waited.as_secs_f64());
}

pub fn record_worker_spawned() {
    counter!("gateway_workers_spawned_total").increment(1);
    gauge!("gateway_active_workers").increment(1.0);
}

pub fn record_worker_retired() {
    gauge!("gateway_active_workers").decrement(1.0);
}

pub fn record_dispatch_timeout() {
    counter!("gateway_dispatch_timeouts_total").increment(1);
}
