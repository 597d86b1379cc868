//! Construction-time faults of the stateful components.

/// Rejected rate limiter configuration.
///
/// Only raised while building a limiter; admission rejections are plain
/// `false` results, never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimiterError {
    #[error("Invalid limiter configuration: {0}")]
    InvalidConfig(String),
}

impl LimiterError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
