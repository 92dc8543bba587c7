//! Session lifecycle and verification sub-state.

use crate::worker::RequestId;
use std::fmt;

/// Why a session is in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The worker could not bring the engine up.
    Initialization,
    /// The engine faulted while proving.
    Engine,
    /// The pending request outlived the prove timeout.
    Timeout,
    /// The worker channel is gone; only a new session helps.
    ChannelClosed,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Proving { request_id: RequestId },
    Failed { message: String, kind: FailureKind },
}

impl SessionState {
    /// Id of the in-flight request, if any.
    pub fn pending_request_id(&self) -> Option<RequestId> {
        match self {
            Self::Proving { request_id } => Some(*request_id),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of the most recent local verification.
///
/// Runs in parallel to the lifecycle: verifying never moves the session out
/// of `Ready`, and a verification error never fails the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VerificationState {
    #[default]
    NotRun,
    Verifying,
    Passed,
    Failed,
    Error(String),
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRun => Ok(()),
            Self::Verifying => write!(f, "Verifying..."),
            Self::Passed => write!(f, "VERIFICATION PASSED"),
            Self::Failed => write!(f, "VERIFICATION FAILED"),
            Self::Error(message) => write!(f, "Error: {}", message),
        }
    }
}
