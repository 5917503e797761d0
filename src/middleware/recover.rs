//! Panic recovery.
//!
//! The outermost layer. A panic anywhere below it becomes an
//! `AppError::Internal` 500 with `Connection: close` instead of a dropped
//! connection.

use std::any::Any;

use axum::response::Response;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::warn;

use crate::error::panic_response;

/// Layer that converts handler panics into server-error responses.
pub fn recover_layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(handle_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    warn!("Recovered from panic while serving request");
    panic_response(detail)
}
