//! # Rate-Limited URL Shortener
//!
//! An in-memory URL shortening service built with Axum, guarded by a global
//! token bucket and a per-client sliding-window limiter.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Entities and capability traits
//! - **Application Layer** ([`application`]) - Rate limiters, URL service,
//!   metrics and the stress harness
//! - **Infrastructure Layer** ([`infrastructure`]) - In-memory stores and
//!   background workers
//! - **API Layer** ([`api`]) - REST and SSE handlers, DTOs, and middleware
//!
//! ## Features
//!
//! - Short codes with a fixed lifetime in a capacity-bounded store
//! - Global token bucket refilled at a fixed rate
//! - Per-client sliding window on link creation
//! - Live metrics over server-sent events
//! - Self load test against an isolated copy of the stack
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the service
//! cargo run
//!
//! # Shorten a URL
//! curl -X POST localhost:8090/api/shorten \
//!      -H 'Content-Type: application/json' \
//!      -d '{"original":"https://example.com"}'
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::limiter::{GlobalRateLimiter, PerClientRateLimiter};
    pub use crate::application::services::{MetricsService, MetricsSnapshot, UrlService};
    pub use crate::config::Config;
    pub use crate::domain::entities::UrlMapping;
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
