//! Mock prover for compiled Cairo programs
//!
//! Accepts a compiled program as JSON and answers with a JSON proof
//! document. Nothing is executed: the "proof" is a SHA-256 commitment to
//! the program's bytecode and its length, which is enough to drive the
//! session with realistic payloads and to detect tampering on verify.

use super::traits::{EngineError, EngineResult, ProofBytes, ProofOutput, ProveInput, ProvingEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

pub const ENGINE_NAME: &str = "cairo-mock";

const COMMITMENT_TAG: &[u8] = b"local-prover/cairo-mock/v1";
const STATUS_SUCCESS: &str = "success";

/// Proof document produced by [`CairoMockEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CairoMockProof {
    pub program_hash: String,
    pub proof_hex: String,
    pub status: String,
    pub execution_trace_length: u32,
}

/// A compiled program reduced to what the mock prover needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    /// `data` entries in program order.
    pub data: Vec<String>,
}

impl CompiledProgram {
    /// Parse compiled-program JSON. The document must be an object with a
    /// `data` array of strings.
    pub fn parse(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("not valid JSON: {}", e))?;
        let object = value
            .as_object()
            .ok_or_else(|| "program must be a JSON object".to_string())?;
        let data = object
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| "program has no `data` array".to_string())?;

        let data = data
            .iter()
            .map(|word| {
                word.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "`data` entries must be strings".to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        if data.is_empty() {
            return Err("program `data` is empty".to_string());
        }
        Ok(Self { data })
    }

    /// Hex SHA-256 over the bytecode words.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        for word in &self.data {
            hasher.update(word.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    pub fn trace_length(&self) -> u32 {
        u32::try_from(self.data.len()).unwrap_or(u32::MAX)
    }
}

fn commitment(program_hash: &str, trace_length: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(COMMITMENT_TAG);
    hasher.update(program_hash.as_bytes());
    hasher.update(trace_length.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Mock engine for compiled JSON programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CairoMockEngine;

impl CairoMockEngine {
    pub fn new() -> Self {
        Self
    }

    fn prove_program(&self, json: &str) -> EngineResult<ProofOutput> {
        debug!(program_size = json.len(), "received program");
        let program = CompiledProgram::parse(json).map_err(EngineError::Fault)?;

        let program_hash = program.hash();
        let trace_length = program.trace_length();
        let proof = CairoMockProof {
            proof_hex: commitment(&program_hash, trace_length),
            program_hash,
            status: STATUS_SUCCESS.to_string(),
            execution_trace_length: trace_length,
        };
        let bytes = serde_json::to_vec(&proof)
            .map_err(|e| EngineError::Fault(format!("Serialization failed: {}", e)))?;

        Ok(ProofOutput::new(
            ENGINE_NAME,
            ProofBytes::new(bytes),
            Some(format!("trace length {}", trace_length)),
        ))
    }
}

impl ProvingEngine for CairoMockEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn initialize(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput> {
        match input {
            ProveInput::JsonProgram(json) => self.prove_program(json),
            other => Err(EngineError::Fault(format!(
                "{} engine cannot prove {}",
                ENGINE_NAME, other
            ))),
        }
    }

    fn verify(&self, proof: &ProofBytes) -> EngineResult<bool> {
        let proof: CairoMockProof = serde_json::from_slice(proof.as_bytes())
            .map_err(|e| EngineError::MalformedProof(format!("not a cairo-mock proof: {}", e)))?;

        Ok(proof.status == STATUS_SUCCESS
            && proof.proof_hex == commitment(&proof.program_hash, proof.execution_trace_length))
    }
}
