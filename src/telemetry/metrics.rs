//! Metric instrument factories for rangelease.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without a registered provider the instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("rangelease")
}

/// Counter: entries upserted by producers.
/// Labels: `queue`.
pub fn tasks_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("rangelease.tasks.enqueued")
        .with_description("Number of task entries enqueued")
        .build()
}

/// Counter: acquisition calls.
/// Labels: `queue`, `result` ("hit" | "empty" | "error").
pub fn acquire_calls() -> Counter<u64> {
    meter()
        .u64_counter("rangelease.acquire.calls")
        .with_description("Number of acquire_due calls")
        .build()
}

/// Counter: tasks handed out under a lease.
/// Labels: `queue`.
pub fn tasks_acquired() -> Counter<u64> {
    meter()
        .u64_counter("rangelease.tasks.acquired")
        .with_description("Number of tasks leased by acquire_due")
        .build()
}

/// Counter: release calls.
/// Labels: `queue`, `outcome` ("removed" | "rescored" | "not_found").
pub fn tasks_released() -> Counter<u64> {
    meter()
        .u64_counter("rangelease.tasks.released")
        .with_description("Number of release calls by outcome")
        .build()
}

/// Counter: requeue calls.
/// Labels: `queue`, `outcome` ("rescored" | "not_found").
pub fn tasks_requeued() -> Counter<u64> {
    meter()
        .u64_counter("rangelease.tasks.requeued")
        .with_description("Number of requeue calls by outcome")
        .build()
}

/// Histogram: store round-trip duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("rangelease.operation.duration_ms")
        .with_description("Lease operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
