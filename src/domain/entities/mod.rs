//! Core domain entities.
//!
//! Entities are plain data structures; storage and expiry policy live in the
//! repositories that hold them.
//!
//! - [`UrlMapping`] - A short code bound to its target URL, with expiry

pub mod url_mapping;

pub use url_mapping::UrlMapping;
