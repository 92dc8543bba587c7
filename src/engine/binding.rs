//! Engine binding: lifecycle guard around one boxed engine.

use super::traits::*;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Owns a single engine and the flags describing how far it has been
/// brought up. Each session holds its own bindings; nothing is global.
pub struct EngineBinding {
    engine: Box<dyn ProvingEngine>,
    initialized: bool,
    precomputed: bool,
}

impl EngineBinding {
    pub fn new(engine: Box<dyn ProvingEngine>) -> Self {
        Self {
            engine,
            initialized: false,
            precomputed: false,
        }
    }

    /// Name of the wrapped engine.
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize the engine. A second call after success is a no-op.
    pub fn initialize(&mut self) -> EngineResult<()> {
        if self.initialized {
            debug!(engine = self.engine.name(), "engine already initialized");
            return Ok(());
        }

        let engine = &mut self.engine;
        guard(|| engine.initialize(), EngineError::Fault)?;
        self.initialized = true;
        info!(engine = self.engine.name(), "engine initialized");
        Ok(())
    }

    /// Warm the engine up. Runs at most once, and only after `initialize`.
    pub fn precompute(&mut self) -> EngineResult<()> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        if self.precomputed {
            return Ok(());
        }

        let start = Instant::now();
        let engine = &mut self.engine;
        guard(|| engine.precompute(), EngineError::Fault)?;
        self.precomputed = true;
        info!(
            engine = self.engine.name(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "engine precompute finished"
        );
        Ok(())
    }

    /// Prove `input`, recording wall-clock time into the metadata.
    pub fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        let start = Instant::now();
        let engine = &mut self.engine;
        let mut output = guard(|| engine.prove(input), EngineError::Fault)?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        output.metadata.time_ms = elapsed_ms;
        output.metadata.proof_size = output.proof.len();
        debug!(
            engine = self.engine.name(),
            elapsed_ms,
            proof_size = output.proof.len(),
            "proof generated"
        );
        Ok(output)
    }

    /// Verify a proof produced by the same engine.
    pub fn verify(&self, proof: &ProofBytes) -> EngineResult<bool> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        let engine = &self.engine;
        guard(|| engine.verify(proof), EngineError::MalformedProof)
    }
}

impl std::fmt::Debug for EngineBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBinding")
            .field("engine", &self.engine.name())
            .field("initialized", &self.initialized)
            .field("precomputed", &self.precomputed)
            .finish()
    }
}

/// Run an engine call, turning a panic into an error built by `on_panic`.
fn guard<T>(
    call: impl FnOnce() -> EngineResult<T>,
    on_panic: fn(String) -> EngineError,
) -> EngineResult<T> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(panic = %message, "engine panicked");
        Err(on_panic(message))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}
