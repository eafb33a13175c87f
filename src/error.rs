//! Error taxonomy for a run.

use crate::cli::{SpawnError, StreamError};

/// Errors that end an attempt.
///
/// Everything except [`RunError::Configuration`] may be retried.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    /// Invalid setup, such as a missing working directory.
    #[error("{0}")]
    Configuration(String),

    /// The CLI exited with a non-zero status.
    #[error("Claude command failed with exit code {code}: {stderr}")]
    SubprocessExit {
        /// Exit code, `-1` if killed by a signal.
        code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The result event reported an error.
    #[error("Claude error: {0}")]
    Reported(String),

    /// The result event had neither an error flag nor a success subtype.
    #[error("Claude did not complete successfully: {0}")]
    Incomplete(String),

    /// The CLI could not be started.
    #[error("Failed to start claude: {0}")]
    Spawn(#[from] SpawnError),

    /// Talking to the running CLI failed.
    #[error("Failed to read claude output: {0}")]
    Stream(#[from] StreamError),
}

impl RunError {
    /// Returns true if another attempt may fix this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}
