//! Shared application state for Axum handlers.
//!
//! This module provides thread-safe, clonable state that is shared across
//! all request handlers. It includes:
//!
//! - **Stores**: Product and review storage behind trait objects
//! - **Limiter**: The per-client admission registry
//! - **Configuration**: Runtime configuration access
//!
//! # Structured Concurrency
//!
//! The limiter's eviction sweep is the only background task. It is tracked
//! by the registry's `TaskTracker`; call [`AppState::shutdown`] after the
//! HTTP server stops to end it.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::limiter::ClientRegistry;
use crate::storage::Stores;

/// Shared application state for Axum handlers.
///
/// Cloned for each request; every field is an `Arc`.
///
/// # Lifecycle
///
/// ```rust,ignore
/// let state = AppState::new(config, stores)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    pub stores: Stores,
    pub limiter: Arc<ClientRegistry>,
}

impl AppState {
    /// Build the state and start the limiter sweep when the limiter is enabled.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// `AppError::ConfigError` when the limiter settings are invalid.
    pub fn new(config: Config, stores: Stores) -> AppResult<Self> {
        let limiter = ClientRegistry::new(config.limiter_settings())
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        let limiter = Arc::new(limiter);
        limiter.spawn_sweeper();

        Ok(Self {
            config: Arc::new(config),
            stores,
            limiter,
        })
    }

    /// Gracefully shutdown all background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");
        self.limiter.shutdown().await;
        info!("All background tasks have completed");
    }
}
