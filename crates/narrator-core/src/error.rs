//! Narrator error types.

use thiserror::Error;

/// Top-level error type shared by every narrator crate.
#[derive(Debug, Error)]
pub enum NarratorError {
    /// A non-privileged role attempted to mutate shared state.
    #[error("only the narrator may change shared narration state")]
    Unauthorized,

    /// A value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The persisted state could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A channel the caller depends on is gone (runtime shut down).
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}
