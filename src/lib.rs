//! # rangelease
//!
//! Atomic range-based lease acquisition for a shared, score-ordered work
//! queue.
//!
//! Tasks are entries in a sorted set, scored by the time they become ready.
//! Workers lease every due task in one atomic store-side step that also
//! pushes those tasks' scores into the future, so concurrent workers never
//! receive the same task while its lease is live. No client-side locks are
//! involved.
//!
//! ```rust,no_run
//! use rangelease::{MemoryLeaseStore, QueueName, RangeLeaseScheduler, TaskId};
//!
//! # async fn demo() -> rangelease::error::Result<()> {
//! let scheduler = RangeLeaseScheduler::new(MemoryLeaseStore::new());
//! let queue = QueueName::new("tasks")?;
//!
//! scheduler.enqueue(&queue, &TaskId::new("task1")?, 1.0).await?;
//! let leased = scheduler.acquire_due(&queue, 2.0, 10.0).await?;
//! assert_eq!(leased, vec![TaskId::new("task1")?]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod telemetry;

pub use db::PgLeaseStore;
pub use model::{Disposition, Entry, QueueName, ReleaseOutcome, RequeueOutcome, TaskId};
pub use scheduler::RangeLeaseScheduler;
pub use store::{LeaseStore, MemoryLeaseStore};
