//! Session lifecycle: state machine, input validation and the async driver.
//!
//! One session = one worker thread + one foreground verification binding.
//! Sessions share nothing, so any number of them may run side by side.

pub mod driver;
pub mod machine;
pub mod state;
pub mod validation;

#[cfg(test)]
mod proptests;

use crate::engine::EngineError;
use crate::worker::ChannelError;
use std::time::Duration;

pub use driver::{Session, SessionOptions};
pub use machine::{SessionMachine, Transition};
pub use state::{FailureKind, SessionState, VerificationState};
pub use validation::{
    BirthYearValidator, InputValidator, JsonProgramValidator, SeedValidator, SquareValidator,
    ValidationError, DEFAULT_EARLIEST_YEAR, DEFAULT_MAX_PROGRAM_BYTES,
};

/// Session operation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    InputValidation(#[from] ValidationError),

    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("A proof request is already in flight")]
    RequestInFlight,

    #[error("{0}")]
    EngineFault(String),

    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("No proof to verify")]
    NoResult,

    #[error("Session failed: {0} (reset to continue)")]
    SessionFailed(String),

    #[error("Proving timed out after {}", format_timeout(.0))]
    TimedOut(Duration),

    #[error("Worker error: {0}")]
    Worker(String),
}

fn format_timeout(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotInitialized => Self::NotInitialized,
            EngineError::MalformedProof(message) => Self::MalformedProof(message),
            EngineError::Fault(message) => Self::EngineFault(message),
        }
    }
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::ChannelClosed => Self::ChannelClosed,
            other => Self::Worker(other.to_string()),
        }
    }
}
