//! Worker channel and envelope protocol.
//!
//! A session talks to exactly one background worker thread. Everything that
//! crosses the boundary is an [`Envelope`] encoded as a JSON text frame; the
//! engine itself never leaves the worker.

mod background;
pub mod channel;
pub mod envelope;

pub use channel::WorkerChannel;
pub use envelope::{
    EngineFault, Envelope, FaultCode, ProveRequest, ProveResult, RequestId, WorkerStatus,
};

/// Worker channel errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Failed to start worker: {0}")]
    Spawn(String),
}
