//! Short code generation.
//!
//! Codes are drawn uniformly from the 62 ASCII alphanumerics
//! (`0-9`, `A-Z`, `a-z`), so every symbol is equally likely at every position.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Shortest code length accepted by configuration.
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code length accepted by configuration.
pub const MAX_CODE_LENGTH: usize = 32;

/// Generates fixed-length random short codes.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Creates a generator producing codes of `length` characters.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns a fresh candidate code.
    ///
    /// Uniqueness is not checked here; the caller retries on collision.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let code = CodeGenerator::new(10).generate();
    /// assert_eq!(code.len(), 10);
    /// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    /// ```
    pub fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}
