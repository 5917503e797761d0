//! # Product Reviews API
//!
//! A JSON HTTP API for products and their reviews, built on Axum, featuring:
//!
//! - **Admission control**: Per-client token buckets with idle eviction
//! - **Listing protocol**: Validated paging, allow-listed sorting, term filters
//! - **Storage**: PostgreSQL through sqlx, or an in-process store for development
//! - **Observability**: Structured logging, Prometheus metrics, panic recovery
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Recover → Rate Limit → Trace → CORS)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, products, reviews)                       │
//! │     └─ Validator, ListQuery, filters                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Storage traits (ProductStore, ReviewStore)                 │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  PgStore (sqlx, PostgreSQL)  │  MemoryStore (memory://)     │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use product_reviews::{AppState, Config, Stores, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let stores = Stores::open(
//!         &config.database_url,
//!         config.db_max_connections,
//!         config.db_query_timeout,
//!     )
//!     .await?;
//!
//!     let state = AppState::new(config, stores)?;
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Rate Limiting
//!
//! ```bash
//! LIMITER_RPS=2 LIMITER_BURST=5 cargo run
//! LIMITER_ENABLED=false cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod storage;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use limiter::{ClientRegistry, LimiterSettings};
pub use routes::build_router;
pub use state::AppState;
pub use storage::Stores;
