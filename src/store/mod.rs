//! The store contract the scheduler runs against.
//!
//! A store is a networked (or in-process) score-ordered set keyed by queue
//! name. Everything except [`LeaseStore::acquire_due`] is an ordinary
//! single-entry call. `acquire_due` is the one piece of logic that must run
//! inside the store, isolated from every other `acquire_due` on the same
//! queue:
//!
//! > select all members scored <= `max_score`; add `increment` to each of
//! > their scores; return the originally selected members.
//!
//! Any store that can do that read-modify-write indivisibly (a server-side
//! script, a database transaction, a single owner of the data) satisfies
//! the contract. The scheduler never locks anything itself.

pub mod memory;

pub use memory::MemoryLeaseStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Entry, QueueName, TaskId};

#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Insert `task` with `score`, or overwrite the score if it exists.
    async fn upsert(&self, queue: &QueueName, task: &TaskId, score: f64) -> Result<()>;

    /// Entries with `min <= score <= max`, ascending by score then task id.
    async fn range(&self, queue: &QueueName, min: f64, max: f64) -> Result<Vec<Entry>>;

    /// The atomic acquisition procedure.
    ///
    /// Selects every entry scored at or below `max_score`, adds `increment`
    /// to each selected score, and returns the selected ids in ascending
    /// (score, id) order. The select and the rescore are one indivisible
    /// step with respect to other calls on the same queue.
    async fn acquire_due(
        &self,
        queue: &QueueName,
        max_score: f64,
        increment: f64,
    ) -> Result<Vec<TaskId>>;

    /// Delete an entry. Returns `false` if it was not present.
    async fn remove(&self, queue: &QueueName, task: &TaskId) -> Result<bool>;

    /// Overwrite the score of an existing entry. Returns `false` and creates
    /// nothing if the entry is absent.
    async fn rescore(&self, queue: &QueueName, task: &TaskId, score: f64) -> Result<bool>;

    /// Current score of one entry.
    async fn score(&self, queue: &QueueName, task: &TaskId) -> Result<Option<f64>>;

    /// Number of entries in the queue.
    async fn count(&self, queue: &QueueName) -> Result<u64>;
}

