//! Domain layer: entities and the capability traits backends implement.
//!
//! # Architecture
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Storage trait definitions
//! - [`errors`] - Construction-time faults
//!
//! The domain layer has no dependency on HTTP, configuration or Tokio.

pub mod entities;
pub mod errors;
pub mod repositories;
