//! Capability traits for the stateful backends.
//!
//! The limiter and the URL store talk to their storage only through these
//! traits so a backend can be swapped without touching admission or
//! shortening logic. Concrete implementations live in
//! `crate::infrastructure::memory`.
//!
//! - [`TokenStore`] - Token bucket counter
//! - [`UrlRepository`] - Short code → URL mappings

pub mod token_store;
pub mod url_repository;

pub use token_store::TokenStore;
pub use url_repository::{InsertOutcome, UrlRepository};

#[cfg(test)]
pub use token_store::MockTokenStore;
#[cfg(test)]
pub use url_repository::MockUrlRepository;
