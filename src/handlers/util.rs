//! Shared utilities for handlers.

use std::collections::HashMap;

use axum::http::HeaderValue;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};

/// Parse a path id. Anything that is not a positive integer names no record.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

/// Attach a `Location` header pointing at a newly created resource.
pub fn with_location(mut response: Response, location: String) -> Response {
    if let Ok(value) = HeaderValue::try_from(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

/// Query parameters as delivered by `Query<HashMap<String, String>>`.
pub type QueryParams = HashMap<String, String>;

/// Status plus JSON body, the shape every successful handler returns.
pub fn json_response<T: serde::Serialize>(
    status: axum::http::StatusCode,
    body: T,
) -> Response {
    (status, axum::Json(body)).into_response()
}
