//! Health endpoint.
//!
//! `GET /v1/healthcheck` answers whenever the process can serve requests; it
//! does not probe the store.

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::models::{HealthResponse, SystemInfo};
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "available",
///   "system_info": {
///     "environment": "development",
///     "version": "0.1.0"
///   }
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available",
        system_info: SystemInfo {
            environment: state.config.environment.to_string(),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}
