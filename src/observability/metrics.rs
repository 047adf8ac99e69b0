//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mesh_requests_total` (counter): requests by service and outcome
//! - `mesh_request_duration_seconds` (histogram): latency by service
//! - `mesh_retries_total` (counter): retry attempts by service
//! - `mesh_probe_failures_total` (counter): failed health probes by service
//! - `mesh_registry_instances` (gauge): instance counts by service and health
//! - `mesh_circuit_state` (gauge): 0=closed, 1=open, 2=half-open

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::registry::service::RegistryStats;
use crate::resilience::BreakerState;

/// Install the Prometheus exporter with an HTTP scrape endpoint. Call at
/// most once per process, from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(error) => tracing::error!(error = %error, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one logical request (after all retries).
pub fn record_request(service: &str, outcome: &'static str, elapsed: Duration) {
    counter!("mesh_requests_total", "service" => service.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("mesh_request_duration_seconds", "service" => service.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record one retry attempt (attempts beyond the first).
pub fn record_retry(service: &str) {
    counter!("mesh_retries_total", "service" => service.to_string()).increment(1);
}

/// Record a failed health probe.
pub fn record_probe_failure(service: &str) {
    counter!("mesh_probe_failures_total", "service" => service.to_string()).increment(1);
}

/// Publish per-service instance counts.
pub fn record_registry_size(stats: &RegistryStats) {
    for (service, counts) in &stats.services {
        gauge!("mesh_registry_instances", "service" => service.clone(), "health" => "healthy")
            .set(counts.healthy as f64);
        gauge!("mesh_registry_instances", "service" => service.clone(), "health" => "unhealthy")
            .set(counts.unhealthy as f64);
        gauge!("mesh_registry_instances", "service" => service.clone(), "health" => "unknown")
            .set(counts.unknown as f64);
    }
}

/// Publish the current breaker state for a service.
pub fn record_breaker_state(service: &str, state: BreakerState) {
    let value = match state {
        BreakerState::Closed => 0.0,
        BreakerState::Open => 1.0,
        BreakerState::HalfOpen => 2.0,
    };
    gauge!("mesh_circuit_state", "service" => service.to_string()).set(value);
}
