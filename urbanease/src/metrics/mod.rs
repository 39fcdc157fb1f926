//! Prometheus metrics.
//!
//! HTTP request metrics come from `axum-prometheus` and are wired up in
//! [`crate::build_router`]. Ledger counters live in the default `prometheus` registry and are
//! appended to the same `/internal/metrics` output. Authentication events are counted through
//! the `metrics` facade so they land in the axum-prometheus recorder.

mod ledger;

pub use ledger::{record_bulk_billing, record_legs_written, record_posting_failure};

/// Count one authentication event, e.g. `login_success` or `login_failure`.
pub fn record_auth_event(event: &'static str) {
    ::metrics::counter!("urbanease_auth_events_total", "event" => event).increment(1);
}

/// Render everything registered in the default `prometheus` registry in text format.
pub fn render_default_registry() -> String {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!("Failed to encode ledger metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
