//! HTTP middleware for admission control and fault isolation.
//!
//! # Architecture
//!
//! ```text
//! Request → Recover → Rate Limiter → Router → Handler → Response
//!              ↓            ↓
//!         500 on panic   429 Too Many Requests
//! ```
//!
//! The rate limiter identifies clients by peer address (see [`client_ip`]);
//! the server must be started with `into_make_service_with_connect_info`.

pub mod client_ip;
pub mod rate_limit;
pub mod recover;

pub use client_ip::client_identity;
pub use rate_limit::RateLimitLayer;
pub use recover::recover_layer;
