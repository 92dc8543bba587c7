//! Mock proving engine for testing.
//!
//! Proofs are a deterministic digest of the input, so `verify` can tell a
//! genuine mock proof from a tampered one without any STARK machinery.

use super::traits::*;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Condvar, Mutex};

pub const ENGINE_NAME: &str = "mock";

const PROOF_TAG: &[u8; 4] = b"MOCK";

/// Scriptable engine. Clones share state, so a test can keep one handle
/// while the worker thread owns another.
#[derive(Clone)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    gate: Arc<(Mutex<bool>, Condvar)>,
}

#[derive(Default)]
struct MockState {
    init_fault: Option<String>,
    prove_fault: Option<String>,
    panic_on_prove: bool,
    init_calls: usize,
    precompute_calls: usize,
    prove_calls: usize,
    verify_calls: usize,
}

/// Handle that opens a closed [`MockEngine`] gate.
#[derive(Clone)]
pub struct MockGate {
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl MockGate {
    /// Let every held and future `prove` call through.
    pub fn release(&self) {
        let (lock, cvar) = &*self.gate;
        let mut open = lock.lock().unwrap();
        *open = true;
        cvar.notify_all();
    }
}

impl MockEngine {
    /// Create a mock whose operations all succeed immediately.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            gate: Arc::new((Mutex::new(true), Condvar::new())),
        }
    }

    /// Make `initialize` fail with `message`.
    pub fn with_init_fault(self, message: &str) -> Self {
        self.state.lock().unwrap().init_fault = Some(message.to_string());
        self
    }

    /// Make every `prove` fail with `message`.
    pub fn with_prove_fault(self, message: &str) -> Self {
        self.state.lock().unwrap().prove_fault = Some(message.to_string());
        self
    }

    /// Make `prove` panic inside the engine.
    pub fn with_prove_panic(self) -> Self {
        self.state.lock().unwrap().panic_on_prove = true;
        self
    }

    /// Close the gate: `prove` blocks until the returned handle is released.
    pub fn gated(self) -> (Self, MockGate) {
        *self.gate.0.lock().unwrap() = false;
        let gate = MockGate {
            gate: Arc::clone(&self.gate),
        };
        (self, gate)
    }

    /// Clear any scripted prove fault.
    pub fn clear_prove_fault(&self) {
        self.state.lock().unwrap().prove_fault = None;
    }

    pub fn init_calls(&self) -> usize {
        self.state.lock().unwrap().init_calls
    }

    pub fn precompute_calls(&self) -> usize {
        self.state.lock().unwrap().precompute_calls
    }

    pub fn prove_calls(&self) -> usize {
        self.state.lock().unwrap().prove_calls
    }

    pub fn verify_calls(&self) -> usize {
        self.state.lock().unwrap().verify_calls
    }

    /// The proof the mock produces for `input`.
    pub fn expected_proof(input: &ProveInput) -> ProofBytes {
        let encoded = serde_json::to_vec(input).unwrap_or_default();
        let mut bytes = PROOF_TAG.to_vec();
        bytes.extend_from_slice(&Sha256::digest(&encoded));
        bytes.extend_from_slice(&encoded);
        ProofBytes::new(bytes)
    }

    fn wait_for_gate(&self) {
        let (lock, cvar) = &*self.gate;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvingEngine for MockEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn initialize(&mut self) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        state.init_calls += 1;
        match &state.init_fault {
            Some(message) => Err(EngineError::Fault(message.clone())),
            None => Ok(()),
        }
    }

    fn precompute(&mut self) -> EngineResult<()> {
        self.state.lock().unwrap().precompute_calls += 1;
        Ok(())
    }

    fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput> {
        let (fault, panic) = {
            let mut state = self.state.lock().unwrap();
            state.prove_calls += 1;
            (state.prove_fault.clone(), state.panic_on_prove)
        };

        self.wait_for_gate();

        if panic {
            panic!("mock engine panicked while proving");
        }
        if let Some(message) = fault {
            return Err(EngineError::Fault(message));
        }

        let public_output = match input {
            ProveInput::Seed(seed) => Some(seed.to_string()),
            ProveInput::BirthYear(_) => Some("age verified".to_string()),
            ProveInput::Guest { argument, .. } => {
                argument.checked_mul(*argument).map(|y| y.to_string())
            }
            ProveInput::JsonProgram(_) => None,
        };
        Ok(ProofOutput::new(
            ENGINE_NAME,
            Self::expected_proof(input),
            public_output,
        ))
    }

    fn verify(&self, proof: &ProofBytes) -> EngineResult<bool> {
        self.state.lock().unwrap().verify_calls += 1;

        let bytes = proof.as_bytes();
        if bytes.len() < PROOF_TAG.len() + 32 || &bytes[..PROOF_TAG.len()] != PROOF_TAG {
            return Err(EngineError::MalformedProof(
                "not a mock proof".to_string(),
            ));
        }

        let (digest, encoded) = bytes[PROOF_TAG.len()..].split_at(32);
        Ok(Sha256::digest(encoded).as_slice() == digest)
    }
}
