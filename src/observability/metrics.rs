//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wire_binding_requests_total` (counter): parsed requests by operation,
//!   outcome (`ok` or the rejection kind)
//! - `wire_binding_responses_total` (counter): serialized responses by
//!   operation, kind (`output`, `error`, `serialize_error`)
//! - `wire_binding_unsupported_bindings_total` (counter): output/error
//!   values left out of a response, by operation and location
//! - `wire_binding_vectors_total` (counter): conformance vectors by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter is optional and off by default

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::binding::Location;

pub fn record_request(operation: &str, outcome: &str) {
    metrics::counter!(
        "wire_binding_requests_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_response(operation: &str, kind: &str) {
    metrics::counter!(
        "wire_binding_responses_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_unsupported_binding(operation: &str, location: Location) {
    metrics::counter!(
        "wire_binding_unsupported_bindings_total",
        "operation" => operation.to_string(),
        "location" => location.to_string()
    )
    .increment(1);
}

pub fn record_vector(outcome: &str) {
    metrics::counter!("wire_binding_vectors_total", "outcome" => outcome.to_string()).increment(1);
}

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
