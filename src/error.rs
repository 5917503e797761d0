use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::header::{CONNECTION, RETRY_AFTER};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;

/// Field key to message mapping produced by a failed validation.
pub type FieldErrors = BTreeMap<String, String>;

/// Message returned for every server-side fault. Internal details are logged, never sent.
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Message returned when an identity or referenced entity does not exist.
pub const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";

/// Application-wide error types with appropriate HTTP status codes.
///
/// Every handler returns `AppResult`; the status code is chosen in exactly
/// one place, the `IntoResponse` impl below.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed for {} field(s)", .0.len())]
    FailedValidation(FieldErrors),

    #[error("record not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("Could not determine client identity: {0}")]
    ClientIdentity(String),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Error envelope: `{"error": "..."}` or `{"error": {"field": "..."}}`.
#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorBody<'a> {
    Message(&'a str),
    Fields(&'a FieldErrors),
}

impl AppError {
    /// HTTP status code for this error kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::ClientIdentity(_)
            | AppError::Store(_)
            | AppError::Internal(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log server faults with full detail; client errors are routine
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let method_message;
        let body = match &self {
            AppError::FailedValidation(errors) => ErrorBody::Fields(errors),
            AppError::NotFound => ErrorBody::Message(NOT_FOUND_MESSAGE),
            AppError::BadRequest(msg) => ErrorBody::Message(msg),
            AppError::MethodNotAllowed(_) => {
                method_message = self.to_string();
                ErrorBody::Message(&method_message)
            }
            AppError::RateLimitExceeded => ErrorBody::Message("rate limit exceeded"),
            AppError::ClientIdentity(_)
            | AppError::Store(_)
            | AppError::Internal(_)
            | AppError::ConfigError(_) => ErrorBody::Message(SERVER_ERROR_MESSAGE),
        };

        let mut response = (status, axum::Json(ErrorEnvelope { error: body })).into_response();

        if matches!(self, AppError::RateLimitExceeded) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }

        response
    }
}

/// Build the 500 response used after a recovered panic.
///
/// The connection is closed so no half-written state is reused.
pub fn panic_response(detail: &str) -> Response {
    let mut response =
        AppError::Internal(format!("handler panicked: {detail}")).into_response();
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
