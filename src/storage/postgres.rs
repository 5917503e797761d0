//! PostgreSQL backend.
//!
//! Text filters use `plainto_tsquery('simple', $n) OR $n = ''` so an empty
//! filter passes every row. Numeric columns are cast to text before
//! `to_tsvector`. The sort column is interpolated from [`ListQuery`], which
//! only ever holds an allow-list entry.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use super::{ProductStore, ReviewStore, StoreError, StoreResult};
use crate::metrics::record_store_query;
use crate::models::{Product, ProductDetails, ProductFilter, Review, ReviewDetails, ReviewFilter};
use crate::pagination::ListQuery;

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, price, average_rating, image_url, created_at";

const PRODUCT_FILTER: &str = "
    WHERE (to_tsvector('simple', name) @@ plainto_tsquery('simple', $1) OR $1 = '')
    AND (to_tsvector('simple', description) @@ plainto_tsquery('simple', $2) OR $2 = '')
    AND (to_tsvector('simple', category) @@ plainto_tsquery('simple', $3) OR $3 = '')
    AND (to_tsvector('simple', price::text) @@ plainto_tsquery('simple', $4) OR $4 = '')
    AND (to_tsvector('simple', average_rating::text) @@ plainto_tsquery('simple', $5) OR $5 = '')
    AND (to_tsvector('simple', image_url) @@ plainto_tsquery('simple', $6) OR $6 = '')";

const REVIEW_COLUMNS: &str = "id, product_id, author, rating, helpful_count, created_at";

const REVIEW_FILTER: &str = "
    WHERE (to_tsvector('simple', author) @@ plainto_tsquery('simple', $1) OR $1 = '')
    AND (to_tsvector('simple', rating::text) @@ plainto_tsquery('simple', $2) OR $2 = '')
    AND (to_tsvector('simple', helpful_count::text) @@ plainto_tsquery('simple', $3) OR $3 = '')";

/// Products and reviews in PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    /// Open a pool against `dsn`, failing fast when the database is unreachable.
    pub async fn connect(
        dsn: &str,
        max_connections: u32,
        query_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(query_timeout)
            .connect(dsn)
            .await?;
        info!(max_connections, "Database connection pool established");
        Ok(Self::from_pool(pool, query_timeout))
    }

    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Run one storage call under the query timeout, recording its duration.
    async fn timed<T, F>(&self, resource: &'static str, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(sqlx::Error::RowNotFound)) => Err(StoreError::NotFound),
            Ok(Err(e)) => Err(StoreError::Database(e)),
            Err(_) => {
                debug!(resource, operation, "Query exceeded timeout");
                Err(StoreError::Timeout)
            }
        };
        record_store_query(
            resource,
            operation,
            !matches!(result, Err(StoreError::Timeout | StoreError::Database(_))),
            start.elapsed().as_secs_f64(),
        );
        result
    }
}

/// Bind-safe conversion of a page bound; Postgres takes BIGINT.
fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        details: ProductDetails {
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            price: row.try_get("price")?,
            average_rating: row.try_get("average_rating")?,
            image_url: row.try_get("image_url")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn review_from_row(row: &PgRow) -> Result<Review, sqlx::Error> {
    Ok(Review {
        id: row.try_get("id")?,
        details: ReviewDetails {
            product_id: row.try_get("product_id")?,
            author: row.try_get("author")?,
            rating: row.try_get("rating")?,
            helpful_count: row.try_get("helpful_count")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

/// Extract the window count from the first row, if any.
fn window_total(rows: &[PgRow]) -> Result<Option<u64>, sqlx::Error> {
    match rows.first() {
        Some(row) => Ok(Some(count_to_u64(row.try_get::<i64, _>("total")?))),
        None => Ok(None),
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert(&self, details: &ProductDetails) -> StoreResult<Product> {
        let query = format!(
            "INSERT INTO products (name, description, category, price, average_rating, image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PRODUCT_COLUMNS}"
        );
        self.timed("products", "insert", async {
            let row = sqlx::query(&query)
                .bind(&details.name)
                .bind(&details.description)
                .bind(&details.category)
                .bind(details.price)
                .bind(details.average_rating)
                .bind(&details.image_url)
                .fetch_one(&self.pool)
                .await?;
            product_from_row(&row)
        })
        .await
    }

    async fn get(&self, id: i64) -> StoreResult<Product> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        self.timed("products", "get", async {
            let row = sqlx::query(&query).bind(id).fetch_one(&self.pool).await?;
            product_from_row(&row)
        })
        .await
    }

    async fn get_all(
        &self,
        filter: &ProductFilter,
        query: &ListQuery,
    ) -> StoreResult<(Vec<Product>, u64)> {
        let select = format!(
            "SELECT COUNT(*) OVER() AS total, {PRODUCT_COLUMNS} FROM products {PRODUCT_FILTER}
             ORDER BY {} {}, id ASC
             LIMIT $7 OFFSET $8",
            query.sort_column,
            query.direction.as_sql()
        );
        let count = format!("SELECT COUNT(*) AS total FROM products {PRODUCT_FILTER}");

        self.timed("products", "get_all", async {
            let rows = sqlx::query(&select)
                .bind(&filter.name)
                .bind(&filter.description)
                .bind(&filter.category)
                .bind(&filter.price)
                .bind(&filter.average_rating)
                .bind(&filter.image_url)
                .bind(to_bigint(query.limit()))
                .bind(to_bigint(query.offset()))
                .fetch_all(&self.pool)
                .await?;

            let total = match window_total(&rows)? {
                Some(total) => total,
                // Past the last page the window count is unavailable
                None if query.offset() > 0 => {
                    let total: i64 = sqlx::query_scalar(&count)
                        .bind(&filter.name)
                        .bind(&filter.description)
                        .bind(&filter.category)
                        .bind(&filter.price)
                        .bind(&filter.average_rating)
                        .bind(&filter.image_url)
                        .fetch_one(&self.pool)
                        .await?;
                    count_to_u64(total)
                }
                None => 0,
            };

            let products = rows
                .iter()
                .map(product_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, sqlx::Error>((products, total))
        })
        .await
    }

    async fn update(&self, product: &Product) -> StoreResult<()> {
        let d = &product.details;
        self.timed("products", "update", async {
            let result = sqlx::query(
                "UPDATE products
                 SET name = $1, description = $2, category = $3, price = $4,
                     average_rating = $5, image_url = $6
                 WHERE id = $7",
            )
            .bind(&d.name)
            .bind(&d.description)
            .bind(&d.category)
            .bind(d.price)
            .bind(d.average_rating)
            .bind(&d.image_url)
            .bind(product.id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        self.timed("products", "delete", async {
            let result = sqlx::query("DELETE FROM products WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn exists(&self, id: i64) -> StoreResult<bool> {
        self.timed("products", "exists", async {
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
        })
        .await
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert(&self, details: &ReviewDetails) -> StoreResult<Review> {
        let query = format!(
            "INSERT INTO reviews (product_id, author, rating, helpful_count)
             VALUES ($1, $2, $3, $4)
             RETURNING {REVIEW_COLUMNS}"
        );
        self.timed("reviews", "insert", async {
            let row = sqlx::query(&query)
                .bind(details.product_id)
                .bind(&details.author)
                .bind(details.rating)
                .bind(details.helpful_count)
                .fetch_one(&self.pool)
                .await?;
            review_from_row(&row)
        })
        .await
    }

    async fn get(&self, id: i64) -> StoreResult<Review> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        self.timed("reviews", "get", async {
            let row = sqlx::query(&query).bind(id).fetch_one(&self.pool).await?;
            review_from_row(&row)
        })
        .await
    }

    async fn get_all(
        &self,
        filter: &ReviewFilter,
        query: &ListQuery,
    ) -> StoreResult<(Vec<Review>, u64)> {
        let select = format!(
            "SELECT COUNT(*) OVER() AS total, {REVIEW_COLUMNS} FROM reviews {REVIEW_FILTER}
             ORDER BY {} {}, id ASC
             LIMIT $4 OFFSET $5",
            query.sort_column,
            query.direction.as_sql()
        );
        let count = format!("SELECT COUNT(*) AS total FROM reviews {REVIEW_FILTER}");

        self.timed("reviews", "get_all", async {
            let rows = sqlx::query(&select)
                .bind(&filter.author)
                .bind(&filter.rating)
                .bind(&filter.helpful_count)
                .bind(to_bigint(query.limit()))
                .bind(to_bigint(query.offset()))
                .fetch_all(&self.pool)
                .await?;

            let total = match window_total(&rows)? {
                Some(total) => total,
                None if query.offset() > 0 => {
                    let total: i64 = sqlx::query_scalar(&count)
                        .bind(&filter.author)
                        .bind(&filter.rating)
                        .bind(&filter.helpful_count)
                        .fetch_one(&self.pool)
                        .await?;
                    count_to_u64(total)
                }
                None => 0,
            };

            let reviews = rows
                .iter()
                .map(review_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, sqlx::Error>((reviews, total))
        })
        .await
    }

    async fn update(&self, review: &Review) -> StoreResult<()> {
        let d = &review.details;
        self.timed("reviews", "update", async {
            let result = sqlx::query(
                "UPDATE reviews SET author = $1, rating = $2, helpful_count = $3 WHERE id = $4",
            )
            .bind(&d.author)
            .bind(d.rating)
            .bind(d.helpful_count)
            .bind(review.id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        self.timed("reviews", "delete", async {
            let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn exists(&self, id: i64) -> StoreResult<bool> {
        self.timed("reviews", "exists", async {
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
        })
        .await
    }
}
