//! PostgreSQL store implementation
//!
//! [`PgStore`] hands out [`PgStoreTx`] handles wrapping a live `sqlx`
//! transaction. The repository traits are implemented on the handle, one
//! file per entity.

mod conversation;
mod payment;
mod plan;
mod robot;
mod subscription;
mod user;
mod webhook_event;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::error::DbResult;
use crate::repo::{Store, StoreTx};
use crate::DbPool;

/// PostgreSQL-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    /// Create a store over a connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// An open PostgreSQL transaction.
///
/// `sqlx` rolls the transaction back when this is dropped uncommitted.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn commit(self: Box<Self>) -> DbResult<()> {
        let PgStoreTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
