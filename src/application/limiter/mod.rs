//! Admission control.
//!
//! - [`GlobalRateLimiter`] - Token bucket gating every request
//! - [`PerClientRateLimiter`] - Sliding window per client identity

pub mod global;
pub mod per_client;

pub use global::GlobalRateLimiter;
pub use per_client::PerClientRateLimiter;
