//! Property-based tests for the session state machine
//!
//! Tests for:
//! - No overlap: a request is only issued while none is pending
//! - Stale immunity: responses for other ids never change the state
//! - Rejection: invalid input never issues a request

use super::{
    machine::{SessionMachine, Transition},
    state::SessionState,
    validation::SeedValidator,
    SessionError,
};
use crate::engine::{EngineError, ProofBytes, ProofMetadata};
use crate::worker::{EngineFault, Envelope, ProveResult, RequestId, WorkerStatus};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Submit(String),
    CompletePending,
    FailPending,
    CompleteStranger,
    FailStranger,
    Abandon,
    Reset,
    Verify(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop_oneof![
            any::<u32>().prop_map(|n| n.to_string()),
            "[a-z -]{0,6}",
        ]
        .prop_map(Op::Submit),
        2 => Just(Op::CompletePending),
        1 => Just(Op::FailPending),
        2 => Just(Op::CompleteStranger),
        2 => Just(Op::FailStranger),
        1 => Just(Op::Abandon),
        1 => Just(Op::Reset),
        1 => any::<bool>().prop_map(Op::Verify),
    ]
}

fn result(id: RequestId) -> ProveResult {
    ProveResult {
        id,
        proof: ProofBytes::new(vec![1, 2, 3]),
        metadata: ProofMetadata {
            engine: "mock".to_string(),
            time_ms: 1.0,
            public_output: None,
            proof_size: 3,
        },
    }
}

fn fault(id: RequestId) -> Envelope {
    Envelope::Fault(EngineFault::from_engine(
        Some(id),
        &EngineError::Fault("boom".to_string()),
    ))
}

fn ready_machine() -> SessionMachine {
    let mut machine = SessionMachine::new(Box::new(SeedValidator));
    machine.start().unwrap();
    machine.handle(Envelope::InitAck(WorkerStatus::Ready));
    machine
}

proptest! {
    #[test]
    fn prop_session_invariants(ops in prop::collection::vec(op(), 1..40)) {
        let mut machine = ready_machine();

        for op in ops {
            let pending = machine.pending_request_id();
            let before = machine.state().clone();

            match op {
                Op::Submit(raw) => {
                    let valid = raw.trim().parse::<u32>().is_ok();
                    match machine.submit(&raw) {
                        Ok(request) => {
                            // Only from Ready, so nothing was pending.
                            prop_assert!(pending.is_none());
                            prop_assert_eq!(before, SessionState::Ready);
                            prop_assert!(valid);
                            prop_assert_eq!(machine.pending_request_id(), Some(request.id));
                        }
                        Err(SessionError::RequestInFlight) => prop_assert!(pending.is_some()),
                        Err(SessionError::InputValidation(_)) => {
                            prop_assert!(!valid);
                            prop_assert_eq!(machine.state(), &before);
                        }
                        Err(_) => prop_assert!(before.is_failed()),
                    }
                }
                Op::CompletePending | Op::FailPending => {
                    if let Some(id) = pending {
                        let envelope = match op {
                            Op::CompletePending => Envelope::ProveAck(result(id)),
                            _ => fault(id),
                        };
                        prop_assert_eq!(machine.handle(envelope), Transition::Applied);
                        prop_assert!(machine.pending_request_id().is_none());
                    }
                }
                Op::CompleteStranger | Op::FailStranger => {
                    let stranger = RequestId::new();
                    let envelope = match op {
                        Op::CompleteStranger => Envelope::ProveAck(result(stranger)),
                        _ => fault(stranger),
                    };
                    prop_assert!(matches!(machine.handle(envelope), Transition::Ignored(_)));
                    prop_assert_eq!(machine.state(), &before);
                }
                Op::Abandon => {
                    if let Some(id) = pending {
                        machine.abandon(id, "timed out".to_string());
                        prop_assert!(machine.state().is_failed());
                    }
                }
                Op::Reset => {
                    let outcome = machine.reset();
                    if pending.is_some() {
                        prop_assert_eq!(outcome, Err(SessionError::RequestInFlight));
                    } else {
                        prop_assert!(outcome.is_ok());
                        prop_assert_eq!(machine.state(), &SessionState::Ready);
                    }
                }
                Op::Verify(valid) => {
                    let had_result = machine.last_result().is_some();
                    match machine.begin_verification() {
                        Ok(_) => {
                            prop_assert!(had_result);
                            machine.finish_verification(&Ok(valid));
                        }
                        Err(e) => {
                            prop_assert!(!had_result);
                            prop_assert_eq!(e, SessionError::NoResult);
                        }
                    }
                    // Verification never moves the lifecycle.
                    prop_assert_eq!(machine.state(), &before);
                }
            }
        }
    }
}
