//! Ledger metrics for Prometheus.

use crate::api::models::payments::PaymentStatus;
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, register_int_counter, register_int_counter_vec};

/// Ledger legs written, by leg status
static LEGS_WRITTEN: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "urbanease_ledger_legs_written_total",
        "Total ledger legs written",
        &["status"]
    )
    .expect("Failed to register urbanease_ledger_legs_written_total metric")
});

/// Completed bulk billing runs
static BULK_BILLING_RUNS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("urbanease_bulk_billing_runs_total", "Total completed bulk billing runs")
        .expect("Failed to register urbanease_bulk_billing_runs_total metric")
});

/// Postings rolled back because the store failed
static POSTING_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("urbanease_ledger_posting_failures_total", "Total ledger postings that were rolled back")
        .expect("Failed to register urbanease_ledger_posting_failures_total metric")
});

/// Record the legs of one posted transaction
pub fn record_legs_written<'a>(statuses: impl IntoIterator<Item = &'a PaymentStatus>) {
    for status in statuses {
        LEGS_WRITTEN.with_label_values(&[status.as_str()]).inc();
    }
}

pub fn record_bulk_billing() {
    BULK_BILLING_RUNS.inc();
}

pub fn record_posting_failure() {
    POSTING_FAILURES.inc();
}
