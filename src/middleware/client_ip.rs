//! Client identity for per-client admission control.
//!
//! The identity is the host part of the TCP peer address recorded by axum's
//! `ConnectInfo`, so every connection from one address shares a bucket.
//! Forwarding headers are not consulted.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

use crate::error::AppError;

/// Peer host of `req` as a string, port stripped.
///
/// # Errors
///
/// [`AppError::ClientIdentity`] when the server was not started with connect
/// info, which is a deployment fault rather than a client error.
pub fn client_identity<B>(req: &Request<B>) -> Result<String, AppError> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .ok_or_else(|| AppError::ClientIdentity("remote address unavailable".to_string()))
}
