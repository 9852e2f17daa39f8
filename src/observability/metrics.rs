//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `certificate_controller_events_total{type}` - Watch events processed, by event type
//! - `certificate_controller_event_errors_total` - Events dropped because processing failed
//! - `certificate_controller_issuances_total` - Issuer calls
//! - `certificate_controller_issuance_failures_total` - Failed issuer calls
//! - `certificate_controller_issuance_duration_seconds` - Duration of issuer calls
//! - `certificate_controller_secrets_archived_total` - Secrets archived before replacement
//! - `certificate_controller_secret_operation_errors_total{operation}` - Failed secret API calls
//! - `certificate_controller_status_update_errors_total` - Failed status write-backs
//! - `certificate_controller_watch_restarts_total{reason}` - Watch stream reopenings

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_controller_events_total",
            "Total number of watch events processed",
        ),
        &["type"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

static EVENT_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_controller_event_errors_total",
        "Total number of watch events dropped after a processing error",
    )
    .expect("Failed to create EVENT_ERRORS_TOTAL metric - this should never happen")
});

static ISSUANCES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_controller_issuances_total",
        "Total number of certificate issuance attempts",
    )
    .expect("Failed to create ISSUANCES_TOTAL metric - this should never happen")
});

static ISSUANCE_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_controller_issuance_failures_total",
        "Total number of failed certificate issuance attempts",
    )
    .expect("Failed to create ISSUANCE_FAILURES_TOTAL metric - this should never happen")
});

static ISSUANCE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "certificate_controller_issuance_duration_seconds",
            "Duration of certificate issuance in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .expect("Failed to create ISSUANCE_DURATION metric - this should never happen")
});

static SECRETS_ARCHIVED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_controller_secrets_archived_total",
        "Total number of secrets archived before replacement",
    )
    .expect("Failed to create SECRETS_ARCHIVED_TOTAL metric - this should never happen")
});

static SECRET_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_controller_secret_operation_errors_total",
            "Total number of failed secret API operations",
        ),
        &["operation"],
    )
    .expect("Failed to create SECRET_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static STATUS_UPDATE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_controller_status_update_errors_total",
        "Total number of failed Certificate status updates",
    )
    .expect("Failed to create STATUS_UPDATE_ERRORS_TOTAL metric - this should never happen")
});

static WATCH_RESTARTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_controller_watch_restarts_total",
            "Total number of times the Certificate watch was reopened",
        ),
        &["reason"],
    )
    .expect("Failed to create WATCH_RESTARTS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Called once at startup; metrics are still updated when unregistered
/// (e.g. in tests), they are simply not exported.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENT_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ISSUANCES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ISSUANCE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ISSUANCE_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_ARCHIVED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_UPDATE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WATCH_RESTARTS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_events(event_type: &str) {
    EVENTS_TOTAL.with_label_values(&[event_type]).inc();
}

pub fn increment_event_errors() {
    EVENT_ERRORS_TOTAL.inc();
}

pub fn increment_issuances() {
    ISSUANCES_TOTAL.inc();
}

pub fn increment_issuance_failures() {
    ISSUANCE_FAILURES_TOTAL.inc();
}

pub fn observe_issuance_duration(duration: f64) {
    ISSUANCE_DURATION.observe(duration);
}

pub fn increment_secrets_archived() {
    SECRETS_ARCHIVED_TOTAL.inc();
}

pub fn increment_secret_operation_errors(operation: &str) {
    SECRET_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn increment_status_update_errors() {
    STATUS_UPDATE_ERRORS_TOTAL.inc();
}

pub fn increment_watch_restarts(reason: &str) {
    WATCH_RESTARTS_TOTAL.with_label_values(&[reason]).inc();
}
