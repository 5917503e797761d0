//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Panic Recovery  │ ← 500 + Connection: close on panic
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 if the client's bucket is empty (when enabled)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Cross-origin headers
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/v1/healthcheck` - Health
//! - `/v1/product`, `/v1/products` - Products
//! - `/v1/review`, `/v1/reviews` - Reviews

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{RateLimitLayer, recover_layer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The rate limiting layer is only installed when the limiter is enabled.
/// Serve the result with `into_make_service_with_connect_info::<SocketAddr>()`
/// so the limiter can identify clients.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let review_item = get(handlers::show_review)
        .patch(handlers::update_review)
        .delete(handlers::delete_review);

    let mut router = Router::new()
        .route("/v1/healthcheck", get(handlers::health_check))
        // Products
        .route("/v1/product", post(handlers::create_product))
        .route("/v1/products", get(handlers::list_products))
        .route(
            "/v1/products/{id}",
            get(handlers::show_product)
                .patch(handlers::update_product)
                .delete(handlers::delete_product),
        )
        // Reviews
        .route("/v1/review", post(handlers::create_review))
        .route("/v1/reviews", get(handlers::list_reviews))
        .route("/v1/review/{id}", review_item.clone())
        .route("/v1/reviews/{id}", review_item)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed);

    // =========================================================================
    // Apply Middleware Stack (order matters - last added runs first)
    // =========================================================================

    // 1. Request body size limit
    info!(
        max_size_bytes = config.max_request_body_size,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. CORS
    router = router.layer(cors);

    // 3. Tracing
    router = router.layer(TraceLayer::new_for_http());

    // 4. Rate limiting (if enabled)
    if state.limiter.is_enabled() {
        info!(
            rps = config.limiter_rps,
            burst = config.limiter_burst,
            "Rate limiting enabled"
        );
        router = router.layer(RateLimitLayer::new(state.limiter.clone()));
    } else {
        info!("Rate limiting disabled (LIMITER_ENABLED=false)");
    }

    // 5. Panic recovery, outermost
    router = router.layer(recover_layer());

    router.with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

/// Build CORS layer from configuration.
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
