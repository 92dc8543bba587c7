//! Local Prover - on-device proof orchestration
//!
//! Generates and verifies STARK proofs on the user's own machine while keeping
//! the foreground responsive: proving runs on a dedicated worker thread and
//! results come back as envelopes over a channel.
//!
//! Key principles:
//! - One worker per session, no shared engine state between sessions
//! - Input is validated before it is ever dispatched
//! - Every response is correlated with its request; stale ones are dropped
//! - Verification is local and never crosses the channel

pub mod config;
pub mod engine;
pub mod logging;
pub mod session;
pub mod view;
pub mod worker;

pub use config::{ProverConfig, Workload};
pub use engine::{EngineBinding, EngineError, ProofBytes, ProveInput, ProvingEngine};
pub use session::{Session, SessionError, SessionOptions};
pub use view::{render_view, SessionView};
pub use worker::{Envelope, WorkerChannel};
