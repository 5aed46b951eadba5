use std::sync::Arc;

use anyhow::Context;
use sqlx::{pool::PoolConnection, PgPool, Postgres, Transaction};

use crate::error::GhnApiResult;

/// Shared handle to the Postgres pool, cloned into every per-entity
/// repository. Mirrors the teacher's `Repository { pool: Arc<PgPool> }` —
/// kept as a thin wrapper rather than one god-struct so each entity's
/// repository module (`notification.rs`, `repo.rs`, ...) only takes the
/// handle it needs.
#[derive(Debug, Clone)]
pub struct Database {
    pub pool: Arc<PgPool>,
}

impl Database {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Database { pool }
    }

    pub async fn connect(&self) -> GhnApiResult<PoolConnection<Postgres>> {
        Ok(self.pool.acquire().await.context("Failed to acquire a database connection")?)
    }

    pub async fn begin(&self) -> GhnApiResult<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await.context("Failed to begin database transaction")?)
    }
}
