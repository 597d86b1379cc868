//! Data Transfer Objects for API requests, responses and stream events.
//!
//! All DTOs use Serde for JSON serialization/deserialization and validator
//! for input validation.

pub mod events;
pub mod health;
pub mod shorten;
