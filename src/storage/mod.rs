//! Storage gateway for products and reviews.
//!
//! Handlers only see the [`ProductStore`] and [`ReviewStore`] traits. Two
//! backends implement both:
//!
//! - [`PgStore`]: PostgreSQL through a sqlx connection pool
//! - [`MemoryStore`]: in-process maps with the same filter, sort and paging
//!   semantics, selected with `DATABASE_URL=memory://`
//!
//! # List semantics
//!
//! `get_all` applies every non-empty text filter as a term match (all query
//! terms must appear in the column), orders by the resolved column and
//! direction with `id ASC` as tie-breaker, then applies limit/offset. The
//! returned count is the number of matching rows before paging. Prices are
//! held and matched at two decimal places, and deleting a product deletes
//! its reviews.

mod memory;
mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::{Product, ProductDetails, ProductFilter, Review, ReviewDetails, ReviewFilter};
use crate::pagination::ListQuery;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// DSN scheme selecting the in-memory backend.
pub const MEMORY_DSN: &str = "memory://";

/// Storage failures. `NotFound` is the only kind a handler reports to the client.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("query timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a product; storage assigns `id` and `created_at`.
    async fn insert(&self, details: &ProductDetails) -> StoreResult<Product>;

    async fn get(&self, id: i64) -> StoreResult<Product>;

    /// One page of matching products and the total match count.
    async fn get_all(
        &self,
        filter: &ProductFilter,
        query: &ListQuery,
    ) -> StoreResult<(Vec<Product>, u64)>;

    /// Persist every editable field of `product`.
    async fn update(&self, product: &Product) -> StoreResult<()>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn exists(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, details: &ReviewDetails) -> StoreResult<Review>;

    async fn get(&self, id: i64) -> StoreResult<Review>;

    async fn get_all(
        &self,
        filter: &ReviewFilter,
        query: &ListQuery,
    ) -> StoreResult<(Vec<Review>, u64)>;

    async fn update(&self, review: &Review) -> StoreResult<()>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn exists(&self, id: i64) -> StoreResult<bool>;
}

/// Both stores behind trait objects, as held by the application state.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
    /// Share one backend for both resources.
    pub fn from_backend<S>(backend: S) -> Self
    where
        S: ProductStore + ReviewStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            products: backend.clone(),
            reviews: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(MemoryStore::new())
    }

    /// Open the backend named by `dsn`: the in-process store for `memory://`,
    /// otherwise PostgreSQL with migrations applied.
    pub async fn open(
        dsn: &str,
        max_connections: u32,
        query_timeout: Duration,
    ) -> StoreResult<Self> {
        if dsn.starts_with(MEMORY_DSN) {
            info!("Using in-memory store");
            return Ok(Self::memory());
        }

        let store = PgStore::connect(dsn, max_connections, query_timeout).await?;
        store.migrate().await?;
        Ok(Self::from_backend(store))
    }
}
