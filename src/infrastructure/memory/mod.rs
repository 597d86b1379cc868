//! In-process backends for the capability traits.
//!
//! - [`MemoryBucket`] - Atomic token counter
//! - [`MemoryUrlRepository`] - Bounded URL map with an expiry index
//! - [`ClientWindowStore`] - Sharded per-client timestamp logs

pub mod bucket;
pub mod client_window_store;
pub mod url_repository;

pub use bucket::MemoryBucket;
pub use client_window_store::{ClientWindow, ClientWindowStore};
pub use url_repository::MemoryUrlRepository;
