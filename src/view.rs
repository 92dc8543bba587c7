//! Presentation adapter.
//!
//! A read-only projection of a session, plus a plain-text renderer for the
//! terminal. Nothing here can change session or engine state.

use crate::session::{SessionState, VerificationState};
use crate::worker::{ProveResult, RequestId};
use std::fmt;

/// Bytes shown in the proof preview.
const PREVIEW_BYTES: usize = 16;

/// Coarse lifecycle for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
    Proving,
    Failed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Proving => "proving",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the user gets to see about the last proof.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofSummary {
    pub request_id: RequestId,
    pub engine: String,
    pub size: usize,
    pub fingerprint: String,
    pub preview: String,
    pub time_ms: f64,
    pub public_output: Option<String>,
}

impl From<&ProveResult> for ProofSummary {
    fn from(result: &ProveResult) -> Self {
        Self {
            request_id: result.id,
            engine: result.metadata.engine.clone(),
            size: result.proof.len(),
            fingerprint: result.proof.fingerprint(),
            preview: result.proof.preview(PREVIEW_BYTES),
            time_ms: result.metadata.time_ms,
            public_output: result.metadata.public_output.clone(),
        }
    }
}

/// Read-only projection of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub lifecycle: Lifecycle,
    pub status: String,
    pub last_proof: Option<ProofSummary>,
    pub verification: VerificationState,
    pub rejection: Option<String>,
    /// Whether a proof request would be accepted right now.
    pub can_prove: bool,
}

impl SessionView {
    pub(crate) fn project(
        state: &SessionState,
        last_result: Option<&ProveResult>,
        verification: &VerificationState,
        rejection: Option<&str>,
    ) -> Self {
        let (lifecycle, status) = match state {
            SessionState::Uninitialized => (Lifecycle::Uninitialized, "Not started".to_string()),
            SessionState::Initializing => (Lifecycle::Initializing, "Initializing...".to_string()),
            SessionState::Ready => {
                let status = match last_result {
                    Some(result) => {
                        format!("Proof generated in {:.2}ms", result.metadata.time_ms)
                    }
                    None => "Ready".to_string(),
                };
                (Lifecycle::Ready, status)
            }
            SessionState::Proving { .. } => (
                Lifecycle::Proving,
                "Proving... (Calculating Trace & STARK)".to_string(),
            ),
            SessionState::Failed { message, .. } => {
                (Lifecycle::Failed, format!("Error: {}", message))
            }
        };

        Self {
            lifecycle,
            status,
            last_proof: last_result.map(ProofSummary::from),
            verification: verification.clone(),
            rejection: rejection.map(str::to_string),
            can_prove: lifecycle == Lifecycle::Ready,
        }
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self::project(
            &SessionState::Uninitialized,
            None,
            &VerificationState::NotRun,
            None,
        )
    }
}

/// Render a view as a terminal block.
pub fn render_view(view: &SessionView) -> String {
    let mut lines = vec![format!("Status: {}", view.status)];

    if let Some(rejection) = &view.rejection {
        lines.push(format!("Rejected: {}", rejection));
    }

    if let Some(proof) = &view.last_proof {
        lines.push(String::new());
        lines.push("Proof Result".to_string());
        lines.push(format!("  engine:       {}", proof.engine));
        lines.push(format!("  request:      {}", proof.request_id));
        lines.push(format!("  size:         {} bytes", proof.size));
        lines.push(format!("  time:         {:.2}ms", proof.time_ms));
        if let Some(output) = &proof.public_output {
            lines.push(format!("  public:       {}", output));
        }
        lines.push(format!("  fingerprint:  {}", proof.fingerprint));
        lines.push(format!("  first bytes:  {}", proof.preview));
    }

    if view.verification != VerificationState::NotRun {
        lines.push(String::new());
        lines.push(format!("Verification: {}", view.verification));
    }

    lines.join("\n")
}
