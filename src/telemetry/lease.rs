//! Span helpers for lease operations.
//!
//! Every scheduler call runs inside one of these spans. Result fields are
//! declared empty and filled in once the store answers.

use tracing::Span;

use crate::model::{QueueName, TaskId};

/// Span for one `acquire_due` call. Record the outcome with
/// [`record_acquired`].
pub fn start_acquire_span(queue: &QueueName, now: f64, increment_by: f64) -> Span {
    tracing::info_span!(
        "lease.acquire",
        "lease.queue" = %queue,
        "lease.now" = now,
        "lease.increment_by" = increment_by,
        "lease.acquired" = tracing::field::Empty,
    )
}

/// Record how many tasks an acquisition leased.
pub fn record_acquired(span: &Span, count: usize) {
    span.record("lease.acquired", count as u64);
}

/// Span for a call that touches a single task: enqueue, release, requeue.
pub fn start_task_span(operation: &'static str, queue: &QueueName, task: &TaskId) -> Span {
    tracing::info_span!(
        "lease.task",
        "lease.operation" = operation,
        "lease.queue" = %queue,
        "lease.task" = %task,
        "lease.outcome" = tracing::field::Empty,
    )
}

/// Record the outcome of a single-task call.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("lease.outcome", outcome);
}
