//! Core data model.
//!
//! A queue is a named set of task entries ordered by score. The score is the
//! task's next eligible time; a task whose score is at or below "now" is due.
//! Leased tasks are simply tasks whose score was pushed past "now" by an
//! acquisition, so storage never records a separate lease state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Name of one score-ordered queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Validate and wrap a queue name. Empty names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("queue name must not be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueueName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(value: QueueName) -> Self {
        value.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque task identity. Unique within a queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Validate and wrap a task identifier. Empty identifiers are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::invalid("task id must not be empty"));
        }
        Ok(Self(id))
    }

    /// A fresh random identifier for producers that have none of their own.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The empty id, which sorts before every valid one. Only used as a
    /// range bound inside stores; never handed out.
    pub(crate) fn lower_bound() -> Self {
        Self(String::new())
    }
}

impl TryFrom<String> for TaskId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Reject NaN and infinities. Every score that reaches a store is finite.
pub fn check_score(what: &str, score: f64) -> Result<f64> {
    if score.is_finite() {
        Ok(score)
    } else {
        Err(Error::invalid(format!("{what} must be finite, got {score}")))
    }
}

/// Reject anything that would not push an acquired entry forward.
pub fn check_increment(increment_by: f64) -> Result<f64> {
    if increment_by.is_finite() && increment_by > 0.0 {
        Ok(increment_by)
    } else {
        Err(Error::invalid(format!(
            "increment_by must be positive and finite, got {increment_by}"
        )))
    }
}

/// Wall-clock time as fractional seconds since the Unix epoch.
pub fn score_at(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0
}

/// Current wall-clock time as a score.
pub fn now_score() -> f64 {
    score_at(Utc::now())
}

// ---------------------------------------------------------------------------
// Entries and outcomes
// ---------------------------------------------------------------------------

/// One queue entry as seen by a range query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub task: TaskId,
    pub score: f64,
}

/// What `release` should do with a finished lease.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disposition {
    /// Work is done: delete the entry.
    Complete,
    /// Put the entry back with the given score, typically at or before now.
    RetryAt(f64),
}

/// Result of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Removed,
    Rescored,
    /// The entry was already gone. Releasing twice lands here.
    NotFound,
}

impl ReleaseOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseOutcome::Removed => "removed",
            ReleaseOutcome::Rescored => "rescored",
            ReleaseOutcome::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ReleaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a requeue. A requeue never creates an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequeueOutcome {
    Rescored,
    NotFound,
}

impl RequeueOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RequeueOutcome::Rescored => "rescored",
            RequeueOutcome::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for RequeueOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
