//! Infrastructure layer: concrete backends and background machinery.
//!
//! This layer implements the traits defined by the domain layer and provides
//! the periodic workers the limiters and the URL store run on.
//!
//! # Modules
//!
//! - [`memory`] - In-memory token bucket, URL repository and client windows
//! - [`worker`] - Periodic background tasks with an idempotent stop

pub mod memory;
pub mod worker;
