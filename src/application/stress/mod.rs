//! Self load-test harness.
//!
//! A stress run builds an [`IsolatedStack`] (its own limiters, URL store and
//! listener), launches the configured load generator against it and relays
//! the generator's output as [`StressEvent`]s. Production state is never
//! touched.

pub mod isolated;
pub mod runner;

use std::io;
use std::process::ExitStatus;

pub use isolated::IsolatedStack;
pub use runner::{StressEvent, TARGET_URL_ENV, run_stress_test};

/// Ways a stress run can fail.
#[derive(Debug, thiserror::Error)]
pub enum StressTestError {
    #[error("failed to start isolated server: {0}")]
    ServerStart(#[source] io::Error),

    #[error("failed to launch load generator: {0}")]
    Spawn(#[source] io::Error),

    #[error("isolated server stopped unexpectedly")]
    UnexpectedServerStop,

    #[error("failed to read load generator output: {0}")]
    Output(#[source] io::Error),

    #[error("load generator exited with {0}")]
    SubprocessFailed(ExitStatus),
}

impl StressTestError {
    /// Message shown to the client; details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            StressTestError::ServerStart(_) => {
                "Failed to start test server. Please try again later."
            }
            StressTestError::UnexpectedServerStop => {
                "Test server stopped unexpectedly. Please try again later."
            }
            StressTestError::Output(_) => {
                "Unexpected error occurred while reading test output. Please try again later."
            }
            StressTestError::Spawn(_) | StressTestError::SubprocessFailed(_) => {
                "Unexpected error occurred while running tests. Please try again later."
            }
        }
    }
}
