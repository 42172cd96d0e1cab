//! # Reconciliation Metrics
//!
//! OpenTelemetry instruments for the reconciliation engine. Without an installed
//! meter provider the global no-op provider absorbs every recording.
//!
//! ```rust
//! use shipment_reconciler::metrics;
//! use opentelemetry::KeyValue;
//!
//! metrics::cycles_total().add(1, &[KeyValue::new("outcome", "success")]);
//! metrics::cycle_duration_ms().record(125.0, &[]);
//! ```

use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::sync::OnceLock;

static RECONCILER_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    RECONCILER_METER.get_or_init(|| opentelemetry::global::meter("shipment-reconciler"))
}

/// Completed reconciliation cycles
///
/// Labels:
/// - outcome: success, failed, aborted
pub fn cycles_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.cycles.total")
        .with_description("Total number of reconciliation cycles completed")
        .build()
}

/// Orders whose update succeeded
pub fn orders_updated_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.orders.updated.total")
        .with_description("Total number of successful order updates")
        .build()
}

/// Failed order update attempts
///
/// Labels:
/// - attempt: 1-based retry attempt
pub fn orders_failed_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.orders.failed.total")
        .with_description("Total number of failed order update attempts")
        .build()
}

/// Receiver notifications dispatched
pub fn notifications_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.notifications.total")
        .with_description("Total number of receiver notifications dispatched")
        .build()
}

/// Wall-clock duration of a reconciliation cycle in milliseconds
pub fn cycle_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("reconciler.cycle.duration_ms")
        .with_description("Reconciliation cycle duration in milliseconds")
        .build()
}
