//! Pure session state machine.
//!
//! No I/O: commands hand back the envelope to send, incoming envelopes are
//! folded in by [`SessionMachine::handle`]. The async driver in
//! [`driver`](super::driver) does the actual sending and receiving.

use super::{
    state::{FailureKind, SessionState, VerificationState},
    validation::InputValidator,
    SessionError,
};
use crate::engine::{EngineError, ProofBytes};
use crate::view::SessionView;
use crate::worker::{Envelope, ProveRequest, ProveResult, RequestId, WorkerStatus};
use tracing::{debug, warn};

/// What an incoming envelope did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(&'static str),
}

pub struct SessionMachine {
    state: SessionState,
    validator: Box<dyn InputValidator>,
    init_acked: bool,
    last_result: Option<ProveResult>,
    verification: VerificationState,
    rejection: Option<String>,
}

impl SessionMachine {
    pub fn new(validator: Box<dyn InputValidator>) -> Self {
        Self {
            state: SessionState::Uninitialized,
            validator,
            init_acked: false,
            last_result: None,
            verification: VerificationState::NotRun,
            rejection: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending_request_id(&self) -> Option<RequestId> {
        self.state.pending_request_id()
    }

    pub fn last_result(&self) -> Option<&ProveResult> {
        self.last_result.as_ref()
    }

    pub fn verification(&self) -> &VerificationState {
        &self.verification
    }

    /// Message of the last locally rejected submission.
    pub fn rejection(&self) -> Option<&str> {
        self.rejection.as_deref()
    }

    /// Begin the session. Returns `Init` the first time, `None` afterwards.
    pub fn start(&mut self) -> Result<Option<Envelope>, SessionError> {
        match &self.state {
            SessionState::Uninitialized => {
                self.state = SessionState::Initializing;
                Ok(Some(Envelope::Init))
            }
            SessionState::Failed { message, kind } => Err(failed(message, *kind)),
            _ => Ok(None),
        }
    }

    /// Validate `raw` and, if acceptable, issue the request to send as `Prove`.
    pub fn submit(&mut self, raw: &str) -> Result<ProveRequest, SessionError> {
        match &self.state {
            SessionState::Ready => {}
            SessionState::Proving { .. } => return Err(SessionError::RequestInFlight),
            SessionState::Uninitialized | SessionState::Initializing => {
                return Err(SessionError::NotInitialized)
            }
            SessionState::Failed { message, kind } => return Err(failed(message, *kind)),
        }

        let input = match self.validator.validate(raw) {
            Ok(input) => input,
            Err(e) => {
                debug!(reason = %e, "submission rejected locally");
                self.rejection = Some(e.to_string());
                return Err(SessionError::InputValidation(e));
            }
        };

        let id = RequestId::new();
        self.rejection = None;
        self.verification = VerificationState::NotRun;
        self.state = SessionState::Proving { request_id: id };
        Ok(ProveRequest { id, input })
    }

    /// Fold an envelope from the worker into the session.
    pub fn handle(&mut self, envelope: Envelope) -> Transition {
        match envelope {
            Envelope::InitAck(WorkerStatus::Ready) => {
                if self.state != SessionState::Initializing {
                    return Transition::Ignored("not initializing");
                }
                self.init_acked = true;
                self.state = SessionState::Ready;
                Transition::Applied
            }
            Envelope::ProveAck(result) => {
                if self.pending_request_id() != Some(result.id) {
                    debug!(request_id = %result.id, "dropping stale result");
                    return Transition::Ignored("stale result");
                }
                self.last_result = Some(result);
                self.state = SessionState::Ready;
                Transition::Applied
            }
            Envelope::Fault(fault) => {
                let initializing = self.state == SessionState::Initializing;
                match fault.id {
                    None if initializing => {
                        self.state = SessionState::Failed {
                            message: fault.message,
                            kind: FailureKind::Initialization,
                        };
                        Transition::Applied
                    }
                    Some(id) if self.pending_request_id() == Some(id) => {
                        self.state = SessionState::Failed {
                            message: fault.message,
                            kind: FailureKind::Engine,
                        };
                        Transition::Applied
                    }
                    None => {
                        warn!(message = %fault.message, code = ?fault.code, "uncorrelated worker fault");
                        Transition::Ignored("uncorrelated fault")
                    }
                    Some(id) => {
                        debug!(request_id = %id, "dropping stale fault");
                        Transition::Ignored("stale fault")
                    }
                }
            }
            Envelope::Init | Envelope::Prove(_) => Transition::Ignored("foreground-bound envelope"),
        }
    }

    /// Give up on `request_id` after the prove timeout.
    ///
    /// Its result, if it ever arrives, is stale from here on.
    pub fn abandon(&mut self, request_id: RequestId, message: String) -> Transition {
        if self.pending_request_id() != Some(request_id) {
            return Transition::Ignored("not pending");
        }
        self.state = SessionState::Failed {
            message,
            kind: FailureKind::Timeout,
        };
        Transition::Applied
    }

    /// The worker channel went away.
    pub fn channel_closed(&mut self) {
        self.state = SessionState::Failed {
            message: SessionError::ChannelClosed.to_string(),
            kind: FailureKind::ChannelClosed,
        };
    }

    /// Enter `Verifying` and hand out the proof to check.
    pub fn begin_verification(&mut self) -> Result<ProofBytes, SessionError> {
        let proof = self
            .last_result
            .as_ref()
            .map(|result| result.proof.clone())
            .ok_or(SessionError::NoResult)?;
        self.verification = VerificationState::Verifying;
        Ok(proof)
    }

    /// Record the outcome of a local verification.
    pub fn finish_verification(&mut self, outcome: &Result<bool, EngineError>) {
        self.verification = match outcome {
            Ok(true) => VerificationState::Passed,
            Ok(false) => VerificationState::Failed,
            Err(e) => VerificationState::Error(e.to_string()),
        };
    }

    /// Leave `Failed`.
    ///
    /// Returns to `Ready` if the worker ever acknowledged `Init`, otherwise to
    /// `Uninitialized` so that `start` sends `Init` again.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match &self.state {
            SessionState::Failed {
                kind: FailureKind::ChannelClosed,
                ..
            } => return Err(SessionError::ChannelClosed),
            SessionState::Failed { .. } => {
                self.state = if self.init_acked {
                    SessionState::Ready
                } else {
                    SessionState::Uninitialized
                };
            }
            SessionState::Proving { .. } => return Err(SessionError::RequestInFlight),
            _ => {}
        }
        self.rejection = None;
        Ok(())
    }

    /// Read-only projection for presentation.
    pub fn view(&self) -> SessionView {
        SessionView::project(
            &self.state,
            self.last_result.as_ref(),
            &self.verification,
            self.rejection.as_deref(),
        )
    }
}

fn failed(message: &str, kind: FailureKind) -> SessionError {
    match kind {
        FailureKind::ChannelClosed => SessionError::ChannelClosed,
        _ => SessionError::SessionFailed(message.to_string()),
    }
}
