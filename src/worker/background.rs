//! Background side of the worker channel.
//!
//! Runs on its own OS thread, owns the proving binding, and handles one frame
//! at a time. `prove` blocks this thread and nothing else.

use super::envelope::{EngineFault, Envelope, ProveRequest, ProveResult, WorkerStatus};
use crate::engine::EngineBinding;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub(crate) struct Worker {
    binding: EngineBinding,
    precompute: bool,
}

impl Worker {
    pub(crate) fn new(binding: EngineBinding, precompute: bool) -> Self {
        Self {
            binding,
            precompute,
        }
    }

    /// Serve frames until the foreground end goes away.
    pub(crate) fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<String>,
        outbox: mpsc::UnboundedSender<String>,
    ) {
        info!(engine = self.binding.engine_name(), "worker started");

        while let Some(frame) = inbox.blocking_recv() {
            let Some(reply) = self.handle_frame(&frame) else {
                continue;
            };

            let encoded = match reply.encode() {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(error = %e, kind = reply.kind(), "dropping unencodable reply");
                    continue;
                }
            };

            if outbox.send(encoded).is_err() {
                debug!(kind = reply.kind(), "foreground gone, dropping reply");
                break;
            }
        }

        info!(engine = self.binding.engine_name(), "worker stopped");
    }

    /// Handle one raw frame, returning the reply to send, if any.
    pub(crate) fn handle_frame(&mut self, frame: &str) -> Option<Envelope> {
        match Envelope::decode(frame) {
            Ok(envelope) => self.handle(envelope),
            Err(e) => {
                warn!(error = %e, "undecodable frame from foreground");
                Some(Envelope::Fault(EngineFault::protocol(None, e.to_string())))
            }
        }
    }

    fn handle(&mut self, envelope: Envelope) -> Option<Envelope> {
        match envelope {
            Envelope::Init => self.handle_init(),
            Envelope::Prove(request) => Some(self.handle_prove(request)),
            other => {
                warn!(kind = other.kind(), "unexpected envelope from foreground");
                Some(Envelope::Fault(EngineFault::protocol(
                    other.request_id(),
                    format!("worker does not accept {}", other.kind()),
                )))
            }
        }
    }

    fn handle_init(&mut self) -> Option<Envelope> {
        if self.binding.is_initialized() {
            debug!("repeated INIT ignored");
            return None;
        }

        if let Err(e) = self.binding.initialize() {
            warn!(error = %e, "engine initialization failed");
            return Some(Envelope::Fault(EngineFault::from_engine(None, &e)));
        }

        // A failed warm-up does not fail initialization.
        if self.precompute {
            if let Err(e) = self.binding.precompute() {
                warn!(error = %e, "engine precompute failed");
            }
        }

        Some(Envelope::InitAck(WorkerStatus::Ready))
    }

    fn handle_prove(&mut self, request: ProveRequest) -> Envelope {
        debug!(request_id = %request.id, input = %request.input, "proving");

        match self.binding.prove(&request.input) {
            Ok(output) => {
                info!(
                    request_id = %request.id,
                    elapsed_ms = output.metadata.time_ms,
                    proof_size = output.proof.len(),
                    "proof complete"
                );
                Envelope::ProveAck(ProveResult {
                    id: request.id,
                    proof: output.proof,
                    metadata: output.metadata,
                })
            }
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "proving failed");
                Envelope::Fault(EngineFault::from_engine(Some(request.id), &e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, ProveInput};
    use crate::worker::envelope::{FaultCode, RequestId};

    fn worker(mock: &MockEngine) -> Worker {
        Worker::new(EngineBinding::new(Box::new(mock.clone())), true)
    }

    fn prove_frame(id: RequestId) -> String {
        Envelope::Prove(ProveRequest {
            id,
            input: ProveInput::Seed(5),
        })
        .encode()
        .unwrap()
    }

    #[test]
    fn test_init_then_repeat_is_silent() {
        let mock = MockEngine::new();
        let mut worker = worker(&mock);
        let init = Envelope::Init.encode().unwrap();

        assert_eq!(
            worker.handle_frame(&init),
            Some(Envelope::InitAck(WorkerStatus::Ready))
        );
        assert_eq!(worker.handle_frame(&init), None);
        assert_eq!(mock.init_calls(), 1);
        assert_eq!(mock.precompute_calls(), 1);
    }

    #[test]
    fn test_init_failure_is_fault_without_id() {
        let mock = MockEngine::new().with_init_fault("engine missing");
        let mut worker = worker(&mock);

        match worker.handle_frame(&Envelope::Init.encode().unwrap()) {
            Some(Envelope::Fault(fault)) => {
                assert_eq!(fault.id, None);
                assert_eq!(fault.message, "engine missing");
                assert_eq!(fault.code, FaultCode::Engine);
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_prove_before_init() {
        let mock = MockEngine::new();
        let mut worker = worker(&mock);
        let id = RequestId::new();

        match worker.handle_frame(&prove_frame(id)) {
            Some(Envelope::Fault(fault)) => {
                assert_eq!(fault.id, Some(id));
                assert_eq!(fault.code, FaultCode::NotInitialized);
            }
            other => panic!("expected fault, got {:?}", other),
        }
        assert_eq!(mock.prove_calls(), 0);
    }

    #[test]
    fn test_prove_echoes_id() {
        let mock = MockEngine::new();
        let mut worker = worker(&mock);
        worker.handle_frame(&Envelope::Init.encode().unwrap());

        let id = RequestId::new();
        match worker.handle_frame(&prove_frame(id)) {
            Some(Envelope::ProveAck(result)) => {
                assert_eq!(result.id, id);
                assert_eq!(result.metadata.engine, "mock");
                assert_eq!(result.metadata.proof_size, result.proof.len());
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_and_misdirected_frames() {
        let mock = MockEngine::new();
        let mut worker = worker(&mock);

        match worker.handle_frame("{\"type\":") {
            Some(Envelope::Fault(fault)) => {
                assert_eq!(fault.id, None);
                assert_eq!(fault.code, FaultCode::Protocol);
            }
            other => panic!("expected protocol fault, got {:?}", other),
        }

        let status = Envelope::InitAck(WorkerStatus::Ready).encode().unwrap();
        assert!(matches!(
            worker.handle_frame(&status),
            Some(Envelope::Fault(EngineFault {
                code: FaultCode::Protocol,
                ..
            }))
        ));
    }
}
