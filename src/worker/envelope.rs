//! Envelope protocol spoken over the worker channel.
//!
//! Wire shape: `{ "type": <DISCRIMINANT>, "payload": <type-dependent> }`.
//! Proving responses echo the request id they answer; `INIT` and its
//! `STATUS` reply carry none.

use super::ChannelError;
use crate::engine::{EngineError, ProofBytes, ProofMetadata, ProveInput};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation id linking a `PROVE` to its `PROOF_COMPLETE` or `ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveRequest {
    pub id: RequestId,
    pub input: ProveInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProveResult {
    pub id: RequestId,
    pub proof: ProofBytes,
    pub metadata: ProofMetadata,
}

/// Fault classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultCode {
    /// `prove` reached an engine that was never initialized.
    NotInitialized,
    /// Anything the engine itself raised.
    #[default]
    Engine,
    /// The worker could not make sense of a frame.
    Protocol,
}

impl From<&EngineError> for FaultCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::NotInitialized => Self::NotInitialized,
            EngineError::MalformedProof(_) | EngineError::Fault(_) => Self::Engine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFault {
    /// Request this fault answers; `None` for initialization or protocol faults.
    #[serde(default)]
    pub id: Option<RequestId>,
    pub message: String,
    #[serde(default)]
    pub code: FaultCode,
}

impl EngineFault {
    pub fn from_engine(id: Option<RequestId>, err: &EngineError) -> Self {
        Self {
            id,
            message: err.to_string(),
            code: FaultCode::from(err),
        }
    }

    pub fn protocol(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
            code: FaultCode::Protocol,
        }
    }
}

/// Payload of `STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    #[serde(rename = "READY")]
    Ready,
}

/// One message unit on the worker channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    /// Foreground asks the worker to load its engine.
    Init,
    /// Worker reports a successful initialization.
    #[serde(rename = "STATUS")]
    InitAck(WorkerStatus),
    /// Foreground asks for a proof.
    Prove(ProveRequest),
    /// Worker delivers a proof.
    #[serde(rename = "PROOF_COMPLETE")]
    ProveAck(ProveResult),
    /// Worker reports a failure.
    #[serde(rename = "ERROR")]
    Fault(EngineFault),
}

impl Envelope {
    /// Wire discriminant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::InitAck(_) => "STATUS",
            Self::Prove(_) => "PROVE",
            Self::ProveAck(_) => "PROOF_COMPLETE",
            Self::Fault(_) => "ERROR",
        }
    }

    /// Correlation id, if this envelope carries one.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Init | Self::InitAck(_) => None,
            Self::Prove(request) => Some(request.id),
            Self::ProveAck(result) => Some(result.id),
            Self::Fault(fault) => fault.id,
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(|e| ChannelError::MalformedFrame(e.to_string()))
    }

    /// Parse a JSON text frame.
    pub fn decode(frame: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(frame).map_err(|e| ChannelError::MalformedFrame(e.to_string()))
    }
}
