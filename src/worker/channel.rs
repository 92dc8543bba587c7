//! Foreground end of the worker channel.
//!
//! Two unbounded mpsc queues of JSON text frames, one per direction, each
//! FIFO. The background end runs on a dedicated thread; see
//! [`background`](super::background).

use super::{background::Worker, envelope::Envelope, ChannelError};
use crate::engine::{EngineBinding, ProvingEngine};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const WORKER_THREAD_NAME: &str = "prover-worker";

/// Bidirectional channel to exactly one background worker.
pub struct WorkerChannel {
    sender: Option<mpsc::UnboundedSender<String>>,
    receiver: mpsc::UnboundedReceiver<String>,
    engine: &'static str,
}

impl WorkerChannel {
    /// Start a worker thread owning `engine`.
    ///
    /// The engine is not initialized until an `INIT` envelope arrives.
    pub fn spawn(engine: Box<dyn ProvingEngine>, precompute: bool) -> Result<Self, ChannelError> {
        let name = engine.name();
        let (to_worker, inbox) = mpsc::unbounded_channel();
        let (outbox, from_worker) = mpsc::unbounded_channel();

        let worker = Worker::new(EngineBinding::new(engine), precompute);
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run(inbox, outbox))
            .map_err(|e| ChannelError::Spawn(e.to_string()))?;

        info!(engine = name, "worker channel open");
        Ok(Self {
            sender: Some(to_worker),
            receiver: from_worker,
            engine: name,
        })
    }

    /// Name of the engine the worker owns.
    pub fn engine_name(&self) -> &'static str {
        self.engine
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Queue an envelope for the worker.
    pub fn send(&self, envelope: &Envelope) -> Result<(), ChannelError> {
        let sender = self.sender.as_ref().ok_or(ChannelError::ChannelClosed)?;
        let frame = envelope.encode()?;
        sender
            .send(frame)
            .map_err(|_| ChannelError::ChannelClosed)?;
        debug!(kind = envelope.kind(), request_id = ?envelope.request_id(), "sent to worker");
        Ok(())
    }

    /// Next envelope from the worker, or `None` once the channel is closed.
    ///
    /// Frames that do not decode are logged and skipped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        if self.is_closed() {
            return None;
        }

        loop {
            let frame = self.receiver.recv().await?;
            match Envelope::decode(&frame) {
                Ok(envelope) => {
                    debug!(
                        kind = envelope.kind(),
                        request_id = ?envelope.request_id(),
                        "received from worker"
                    );
                    return Some(envelope);
                }
                Err(e) => warn!(error = %e, "skipping undecodable frame from worker"),
            }
        }
    }

    /// Tear the channel down.
    ///
    /// Does not wait for an in-flight computation: the worker thread finishes
    /// it, fails to deliver the result, and exits.
    pub fn close(&mut self) {
        if self.sender.take().is_some() {
            self.receiver.close();
            info!(engine = self.engine, "worker channel closed");
        }
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        self.close();
    }
}
