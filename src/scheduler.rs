//! Range lease scheduler: the typed API workers and producers call.
//!
//! Producers `enqueue` tasks scored by their ready time. Workers call
//! `acquire_due`, which runs the store's atomic procedure: every entry scored
//! at or below `now` is selected and has `increment_by` added to its score in
//! the same indivisible step, so a concurrent caller can never see it as due.
//! A worker then `release`s what it finished; anything it abandons becomes
//! due again once "now" catches up with the pushed-out score.
//!
//! The increment is additive. A task acquired `n` times without being
//! released sits `n * increment_by` past its original ready time, so a task
//! that keeps failing drifts further out on every sweep. `increment_by` is a
//! fixed step in score units, not a wall-clock lease length.
//!
//! The scheduler keeps no copy of queue contents and takes no locks. All
//! mutual exclusion comes from the store.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::model::{
    Disposition, Entry, QueueName, ReleaseOutcome, RequeueOutcome, TaskId, check_increment,
    check_score,
};
use crate::store::LeaseStore;
use crate::telemetry::lease::{
    record_acquired, record_outcome, start_acquire_span, start_task_span,
};
use crate::telemetry::metrics;

/// Client-side handle over a [`LeaseStore`]. Cheap to clone; share it
/// between any number of worker tasks.
pub struct RangeLeaseScheduler<S> {
    store: Arc<S>,
}

impl<S> Clone for RangeLeaseScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn record_duration(operation: &'static str, started: Instant) {
    metrics::operation_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("operation", operation)],
    );
}

impl<S: LeaseStore> RangeLeaseScheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert `task` with score `ready_at`, or overwrite its score.
    pub async fn enqueue(&self, queue: &QueueName, task: &TaskId, ready_at: f64) -> Result<()> {
        check_score("ready_at", ready_at)?;

        let span = start_task_span("enqueue", queue, task);
        let started = Instant::now();
        let result = self
            .store
            .upsert(queue, task, ready_at)
            .instrument(span.clone())
            .await;
        record_duration("lease.enqueue", started);

        match result {
            Ok(()) => {
                record_outcome(&span, "ok");
                metrics::tasks_enqueued().add(1, &[KeyValue::new("queue", queue.to_string())]);
                Ok(())
            }
            Err(e) => {
                record_outcome(&span, "error");
                span.in_scope(|| tracing::warn!(error = %e, "enqueue failed"));
                Err(e)
            }
        }
    }

    /// Lease every task due at `now`.
    ///
    /// Returns the leased ids in ascending score order; each one's score has
    /// been raised by `increment_by`. An empty vector means nothing was due
    /// and nothing was changed.
    ///
    /// `increment_by` must be positive and should be large enough that
    /// `score + increment_by` lands after the caller's next `now`, or the
    /// task will be due again immediately.
    ///
    /// If this fails with a transport error the procedure may or may not
    /// have run. Repeating it is harmless (tasks already leased are not due
    /// and are only pushed out further if still due), but callers should
    /// prefer to rescan on their normal schedule.
    pub async fn acquire_due(
        &self,
        queue: &QueueName,
        now: f64,
        increment_by: f64,
    ) -> Result<Vec<TaskId>> {
        check_score("now", now)?;
        check_increment(increment_by)?;

        let span = start_acquire_span(queue, now, increment_by);
        let started = Instant::now();
        let result = self
            .store
            .acquire_due(queue, now, increment_by)
            .instrument(span.clone())
            .await;
        record_duration("lease.acquire", started);

        let queue_label = KeyValue::new("queue", queue.to_string());
        match result {
            Ok(tasks) => {
                record_acquired(&span, tasks.len());
                let outcome = if tasks.is_empty() { "empty" } else { "hit" };
                metrics::acquire_calls()
                    .add(1, &[queue_label.clone(), KeyValue::new("result", outcome)]);
                if !tasks.is_empty() {
                    metrics::tasks_acquired().add(tasks.len() as u64, &[queue_label]);
                    span.in_scope(|| tracing::debug!(count = tasks.len(), "tasks leased"));
                }
                Ok(tasks)
            }
            Err(e) => {
                metrics::acquire_calls().add(1, &[queue_label, KeyValue::new("result", "error")]);
                span.in_scope(|| {
                    tracing::warn!(error = %e, transport = e.is_transport(), "acquire_due failed")
                });
                Err(e)
            }
        }
    }

    /// Finish with a leased task.
    ///
    /// [`Disposition::Complete`] deletes the entry. [`Disposition::RetryAt`]
    /// rescores an existing entry so it becomes due again at that score.
    /// Releasing an entry that is already gone returns
    /// [`ReleaseOutcome::NotFound`] rather than an error, so a second
    /// release of the same task is a no-op.
    pub async fn release(
        &self,
        queue: &QueueName,
        task: &TaskId,
        disposition: Disposition,
    ) -> Result<ReleaseOutcome> {
        if let Disposition::RetryAt(score) = disposition {
            check_score("retry score", score)?;
        }

        let span = start_task_span("release", queue, task);
        let started = Instant::now();
        let result = self
            .dispose(queue, task, disposition)
            .instrument(span.clone())
            .await;
        record_duration("lease.release", started);

        match result {
            Ok(outcome) => {
                record_outcome(&span, outcome.as_str());
                metrics::tasks_released().add(
                    1,
                    &[
                        KeyValue::new("queue", queue.to_string()),
                        KeyValue::new("outcome", outcome.as_str()),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => {
                record_outcome(&span, "error");
                span.in_scope(|| tracing::warn!(error = %e, "release failed"));
                Err(e)
            }
        }
    }

    async fn dispose(
        &self,
        queue: &QueueName,
        task: &TaskId,
        disposition: Disposition,
    ) -> Result<ReleaseOutcome> {
        let found = match disposition {
            Disposition::Complete => self.store.remove(queue, task).await?,
            Disposition::RetryAt(score) => self.store.rescore(queue, task, score).await?,
        };
        Ok(match (disposition, found) {
            (_, false) => ReleaseOutcome::NotFound,
            (Disposition::Complete, true) => ReleaseOutcome::Removed,
            (Disposition::RetryAt(_), true) => ReleaseOutcome::Rescored,
        })
    }

    /// Move an existing task to `new_ready_at`, typically a backoff after a
    /// handled failure. Never creates an entry: a task that was already
    /// released stays released and [`RequeueOutcome::NotFound`] is returned.
    pub async fn requeue(
        &self,
        queue: &QueueName,
        task: &TaskId,
        new_ready_at: f64,
    ) -> Result<RequeueOutcome> {
        check_score("new_ready_at", new_ready_at)?;

        let span = start_task_span("requeue", queue, task);
        let started = Instant::now();
        let result = self
            .store
            .rescore(queue, task, new_ready_at)
            .instrument(span.clone())
            .await;
        record_duration("lease.requeue", started);

        match result {
            Ok(found) => {
                let outcome = if found {
                    RequeueOutcome::Rescored
                } else {
                    RequeueOutcome::NotFound
                };
                record_outcome(&span, outcome.as_str());
                metrics::tasks_requeued().add(
                    1,
                    &[
                        KeyValue::new("queue", queue.to_string()),
                        KeyValue::new("outcome", outcome.as_str()),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => {
                record_outcome(&span, "error");
                span.in_scope(|| tracing::warn!(error = %e, "requeue failed"));
                Err(e)
            }
        }
    }

    /// Snapshot of entries scored within `[min, max]`, ascending. Read-only.
    ///
    /// The snapshot is stale as soon as it returns; never use it to decide
    /// which task to work on.
    pub async fn pending(&self, queue: &QueueName, min: f64, max: f64) -> Result<Vec<Entry>> {
        if min.is_nan() || max.is_nan() {
            return Err(Error::InvalidArgument(
                "range bounds must not be NaN".to_string(),
            ));
        }
        self.store.range(queue, min, max).await
    }

    /// Current score of one task, if it is still queued.
    pub async fn score_of(&self, queue: &QueueName, task: &TaskId) -> Result<Option<f64>> {
        self.store.score(queue, task).await
    }

    /// Number of entries in `queue`, leased or not.
    pub async fn count(&self, queue: &QueueName) -> Result<u64> {
        self.store.count(queue).await
    }
}
