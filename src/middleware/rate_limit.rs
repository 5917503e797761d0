//! Rate limiting middleware.
//!
//! Wraps the router in a tower layer that asks the shared
//! [`ClientRegistry`] to admit each request before it reaches routing.
//!
//! # Responses
//!
//! - Admitted: forwarded to the inner service untouched
//! - Bucket empty: `429` with `Retry-After: 1` and `{"error": "rate limit exceeded"}`
//! - Peer address unavailable: `500`; the request is not counted against anyone
//!
//! The layer is only installed when the limiter is enabled.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::warn;

use super::client_ip::client_identity;
use crate::error::AppError;
use crate::limiter::ClientRegistry;
use crate::metrics::record_rate_limited;

/// Rate limiting layer for the tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let registry = Arc::new(ClientRegistry::new(settings)?);
/// let app = Router::new()
///     .route("/v1/products", get(list_products))
///     .layer(RateLimitLayer::new(registry));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    registry: Arc<ClientRegistry>,
}

impl RateLimitLayer {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            registry: self.registry.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    registry: Arc<ClientRegistry>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Admission is decided synchronously; the registry lock never spans an await
        let decision = client_identity(&req).and_then(|client| {
            if self.registry.admit(&client) {
                Ok(())
            } else {
                record_rate_limited();
                warn!(
                    client = %client,
                    path = %req.uri().path(),
                    "Rate limit exceeded for client"
                );
                Err(AppError::RateLimitExceeded)
            }
        });

        // Take the service that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match decision {
                Ok(()) => inner.call(req).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}
