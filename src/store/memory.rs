//! In-process store.
//!
//! One mutex owns every queue, so each call (and in particular
//! `acquire_due`) runs to completion before the next one observes the data.
//! This is the "single owner of the queue" shape of the store contract: the
//! lock lives inside the store, never in the scheduler.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::LeaseStore;
use crate::error::{Error, Result};
use crate::model::{Entry, QueueName, TaskId};

/// Ordering key: score first, task id to break ties.
#[derive(Debug, Clone)]
struct Key {
    score: f64,
    task: TaskId,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.task.cmp(&other.task))
    }
}

/// One sorted set: an ordered index plus a score lookup by member.
#[derive(Debug, Default)]
struct SortedSet {
    by_score: BTreeSet<Key>,
    scores: HashMap<TaskId, f64>,
}

impl SortedSet {
    fn insert(&mut self, task: &TaskId, score: f64) {
        if let Some(old) = self.scores.insert(task.clone(), score) {
            self.by_score.remove(&Key {
                score: old,
                task: task.clone(),
            });
        }
        self.by_score.insert(Key {
            score,
            task: task.clone(),
        });
    }

    fn remove(&mut self, task: &TaskId) -> bool {
        match self.scores.remove(task) {
            Some(score) => {
                self.by_score.remove(&Key {
                    score,
                    task: task.clone(),
                });
                true
            }
            None => false,
        }
    }

    fn range(&self, min: f64, max: f64) -> impl Iterator<Item = &Key> {
        // total_cmp puts -0.0 below 0.0; both satisfy `score >= 0.0`.
        let min = if min == 0.0 { -0.0 } else { min };
        let start = Key {
            score: min,
            task: TaskId::lower_bound(),
        };
        self.by_score
            .range(start..)
            .take_while(move |k| k.score <= max)
    }
}

/// Score-ordered sets held in process memory.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    queues: Mutex<HashMap<QueueName, SortedSet>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<QueueName, SortedSet>>> {
        self.queues
            .lock()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn upsert(&self, queue: &QueueName, task: &TaskId, score: f64) -> Result<()> {
        self.lock()?
            .entry(queue.clone())
            .or_default()
            .insert(task, score);
        Ok(())
    }

    async fn range(&self, queue: &QueueName, min: f64, max: f64) -> Result<Vec<Entry>> {
        let queues = self.lock()?;
        Ok(queues
            .get(queue)
            .map(|set| {
                set.range(min, max)
                    .map(|k| Entry {
                        task: k.task.clone(),
                        score: k.score,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn acquire_due(
        &self,
        queue: &QueueName,
        max_score: f64,
        increment: f64,
    ) -> Result<Vec<TaskId>> {
        let mut queues = self.lock()?;
        let Some(set) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let due: Vec<Key> = set
            .by_score
            .iter()
            .take_while(|k| k.score <= max_score)
            .cloned()
            .collect();

        // All new scores are checked before any is written, so an overflow
        // leaves the set exactly as it was.
        if let Some(key) = due.iter().find(|k| !(k.score + increment).is_finite()) {
            return Err(Error::Procedure(format!(
                "score overflow: {} + {increment} for task {}",
                key.score, key.task
            )));
        }

        for key in &due {
            set.insert(&key.task, key.score + increment);
        }

        Ok(due.into_iter().map(|k| k.task).collect())
    }

    async fn remove(&self, queue: &QueueName, task: &TaskId) -> Result<bool> {
        let mut queues = self.lock()?;
        let removed = queues.get_mut(queue).is_some_and(|set| set.remove(task));
        if queues.get(queue).is_some_and(|set| set.scores.is_empty()) {
            queues.remove(queue);
        }
        Ok(removed)
    }

    async fn rescore(&self, queue: &QueueName, task: &TaskId, score: f64) -> Result<bool> {
        let mut queues = self.lock()?;
        match queues.get_mut(queue) {
            Some(set) if set.scores.contains_key(task) => {
                set.insert(task, score);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn score(&self, queue: &QueueName, task: &TaskId) -> Result<Option<f64>> {
        Ok(self
            .lock()?
            .get(queue)
            .and_then(|set| set.scores.get(task).copied()))
    }

    async fn count(&self, queue: &QueueName) -> Result<u64> {
        Ok(self
            .lock()?
            .get(queue)
            .map_or(0, |set| set.scores.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q() -> QueueName {
        QueueName::new("unit").unwrap()
    }

    fn t(id: &str) -> TaskId {
        TaskId::new(id).unwrap()
    }

    #[tokio::test]
    async fn equal_scores_order_by_task_id() {
        let store = MemoryLeaseStore::new();
        store.upsert(&q(), &t("b"), 5.0).await.unwrap();
        store.upsert(&q(), &t("a"), 5.0).await.unwrap();
        store.upsert(&q(), &t("c"), 1.0).await.unwrap();

        let ids: Vec<_> = store
            .range(&q(), f64::NEG_INFINITY, f64::INFINITY)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.task)
            .collect();
        assert_eq!(ids, vec![t("c"), t("a"), t("b")]);
    }

    #[tokio::test]
    async fn upsert_moves_entry_in_index() {
        let store = MemoryLeaseStore::new();
        store.upsert(&q(), &t("a"), 1.0).await.unwrap();
        store.upsert(&q(), &t("a"), 9.0).await.unwrap();

        assert_eq!(store.count(&q()).await.unwrap(), 1);
        assert!(store.range(&q(), 0.0, 5.0).await.unwrap().is_empty());
        assert_eq!(store.score(&q(), &t("a")).await.unwrap(), Some(9.0));
    }

    #[tokio::test]
    async fn range_bounds_are_inclusive() {
        let store = MemoryLeaseStore::new();
        for (id, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            store.upsert(&q(), &t(id), score).await.unwrap();
        }

        let entries = store.range(&q(), 2.0, 3.0).await.unwrap();
        assert_eq!(
            entries,
            vec![
                Entry {
                    task: t("b"),
                    score: 2.0
                },
                Entry {
                    task: t("c"),
                    score: 3.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn range_includes_negative_zero_from_zero() {
        let store = MemoryLeaseStore::new();
        store.upsert(&q(), &t("neg"), -0.0).await.unwrap();
        store.upsert(&q(), &t("below"), -1.0).await.unwrap();

        let entries = store.range(&q(), 0.0, 0.0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task, t("neg"));
    }

    #[tokio::test]
    async fn range_starts_mid_set() {
        let store = MemoryLeaseStore::new();
        for i in 0..100 {
            store
                .upsert(&q(), &t(&format!("t{i:02}")), f64::from(i))
                .await
                .unwrap();
        }

        let ids: Vec<_> = store
            .range(&q(), 97.0, f64::INFINITY)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.task)
            .collect();
        assert_eq!(ids, vec![t("t97"), t("t98"), t("t99")]);
    }

    #[tokio::test]
    async fn overflowing_increment_fails_and_changes_nothing() {
        let store = MemoryLeaseStore::new();
        store.upsert(&q(), &t("small"), 1.0).await.unwrap();
        store.upsert(&q(), &t("huge"), 1e308).await.unwrap();

        let err = store.acquire_due(&q(), 1e308, 1e308).await.unwrap_err();
        assert!(matches!(err, Error::Procedure(_)), "got {err:?}");
        assert!(!err.is_transport());

        // Neither entry moved, including the one that would not overflow.
        assert_eq!(store.score(&q(), &t("small")).await.unwrap(), Some(1.0));
        assert_eq!(store.score(&q(), &t("huge")).await.unwrap(), Some(1e308));
        assert_eq!(
            store.acquire_due(&q(), 1.0, 10.0).await.unwrap(),
            vec![t("small")]
        );
    }

    #[tokio::test]
    async fn rescore_does_not_create() {
        let store = MemoryLeaseStore::new();
        assert!(!store.rescore(&q(), &t("ghost"), 1.0).await.unwrap());
        assert_eq!(store.count(&q()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn queues_are_isolated() {
        let store = MemoryLeaseStore::new();
        let other = QueueName::new("other").unwrap();
        store.upsert(&q(), &t("a"), 1.0).await.unwrap();
        store.upsert(&other, &t("a"), 1.0).await.unwrap();

        let got = store.acquire_due(&q(), 1.0, 10.0).await.unwrap();
        assert_eq!(got, vec![t("a")]);
        assert_eq!(store.score(&other, &t("a")).await.unwrap(), Some(1.0));
    }
}
