//! Postgres-backed lease store.
//!
//! Entries live in `rangelease_entries`; the acquisition procedure is the
//! server-side function `rangelease_acquire_due`, installed by the crate's
//! migrations and invoked by name on every `acquire_due`.

pub mod lease;

use crate::error::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Source of the server-side acquisition procedure, as registered by the
/// migrations. Exposed so operators can inspect or install it by hand.
pub const ACQUIRE_DUE_PROCEDURE: &str =
    include_str!("../../migrations/0002_rangelease_acquire_due.sql");

/// Lease store handle. Owns the connection pool; holds no queue data.
#[derive(Clone)]
pub struct PgLeaseStore {
    pool: PgPool,
}

impl PgLeaseStore {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, 10).await
    }

    /// Connect with an explicit pool size. Workers sharing one handle each
    /// hold a connection only for the duration of a single call.
    pub async fn connect_with(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::debug!(max_connections, "lease store connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the entries table and register the acquisition procedure.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Other(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Re-register the acquisition procedure without running migrations.
    /// `CREATE OR REPLACE`, so safe to repeat.
    pub async fn register_procedure(&self) -> Result<()> {
        sqlx::raw_sql(ACQUIRE_DUE_PROCEDURE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Simple health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for in-flight calls to return their
    /// connections.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("lease store closed");
    }
}
