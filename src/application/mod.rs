//! Application layer: admission control, services and the stress harness.
//!
//! Components here own the background workers and expose synchronous,
//! lock-scoped operations to the HTTP layer.
//!
//! # Modules
//!
//! - [`limiter`] - Global token bucket and per-client sliding window
//! - [`services`] - URL shortening and metrics sampling
//! - [`stress`] - Isolated load-test runs

pub mod limiter;
pub mod services;
pub mod stress;
