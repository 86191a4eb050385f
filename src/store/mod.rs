//! Persistence contract for orders.
//!
//! Adapters never lock across calls: `conditional_update` is the only write
//! that can move an existing order, and it is a single compare-and-set
//! against the stored `version`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::order::{NewOrder, Order, OrderStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("corrupt order row: {0}")]
    CorruptRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a compare-and-set on an order's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Order),
    VersionConflict,
    NotFound,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Short backend name, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    /// Persists a new unassigned order at version 1 and returns it with its id.
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn fetch(&self, id: i64) -> Result<Option<Order>, StoreError>;

    /// Sets `status` and bumps `version` to `expected_version + 1` only if
    /// the stored version still equals `expected_version`.
    async fn conditional_update(
        &self,
        id: i64,
        expected_version: i64,
        new_status: OrderStatus,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Orders by ascending id.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError>;
}
