//! `LeaseStore` over `rangelease_entries` via direct SQLx.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Entry, QueueName, TaskId};
use crate::store::LeaseStore;

#[async_trait]
impl LeaseStore for super::PgLeaseStore {
    async fn upsert(&self, queue: &QueueName, task: &TaskId, score: f64) -> Result<()> {
        sqlx::query(
            "INSERT INTO rangelease_entries (queue, task, score) VALUES ($1, $2, $3)
             ON CONFLICT (queue, task) DO UPDATE SET score = EXCLUDED.score",
        )
        .bind(queue.as_str())
        .bind(task.as_str())
        .bind(score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn range(&self, queue: &QueueName, min: f64, max: f64) -> Result<Vec<Entry>> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT task, score FROM rangelease_entries
             WHERE queue = $1 AND score >= $2 AND score <= $3
             ORDER BY score, task",
        )
        .bind(queue.as_str())
        .bind(min)
        .bind(max)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(task, score)| {
                Ok(Entry {
                    task: TaskId::new(task)?,
                    score,
                })
            })
            .collect()
    }

    async fn acquire_due(
        &self,
        queue: &QueueName,
        max_score: f64,
        increment: f64,
    ) -> Result<Vec<TaskId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT acquired_task FROM rangelease_acquire_due($1, $2, $3)")
                .bind(queue.as_str())
                .bind(max_score)
                .bind(increment)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|(task,)| TaskId::new(task)).collect()
    }

    async fn remove(&self, queue: &QueueName, task: &TaskId) -> Result<bool> {
        let rows_affected =
            sqlx::query("DELETE FROM rangelease_entries WHERE queue = $1 AND task = $2")
                .bind(queue.as_str())
                .bind(task.as_str())
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn rescore(&self, queue: &QueueName, task: &TaskId, score: f64) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE rangelease_entries SET score = $3 WHERE queue = $1 AND task = $2",
        )
        .bind(queue.as_str())
        .bind(task.as_str())
        .bind(score)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn score(&self, queue: &QueueName, task: &TaskId) -> Result<Option<f64>> {
        let row: Option<(f64,)> = sqlx::query_as(
            "SELECT score FROM rangelease_entries WHERE queue = $1 AND task = $2",
        )
        .bind(queue.as_str())
        .bind(task.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(score,)| score))
    }

    async fn count(&self, queue: &QueueName) -> Result<u64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM rangelease_entries WHERE queue = $1")
                .bind(queue.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0 as u64)
    }
}
