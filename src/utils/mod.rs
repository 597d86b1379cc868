//! Utility functions for code generation and URL validation.
//!
//! - [`code_generator`] - Random fixed-length short codes
//! - [`url_validator`] - Length, format, host and protocol checks

pub mod code_generator;
pub mod url_validator;
