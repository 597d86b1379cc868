//! HTTP middleware for request processing and protection.
//!
//! Provides rate limiting, CORS, static file guards and observability middleware.

pub mod cors;
pub mod rate_limit;
pub mod static_files;
pub mod tracing;
