//! Versioned proof artifact.
//!
//! Engines ship the STARK proof together with the public inputs it was made
//! against, encoded as CBOR. The artifact is what travels as [`ProofBytes`].

use super::traits::{EngineError, EngineResult, ProofBytes};
use serde::{Deserialize, Serialize};

/// Current artifact layout. Bump when the encoding or an AIR changes.
pub const FORMAT_VERSION: u16 = 2;

/// A STARK proof plus everything a verifier needs besides the AIR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub format_version: u16,

    /// Engine that produced the proof; a verifier refuses foreign artifacts.
    pub engine: String,

    /// Public inputs as canonical field element integers.
    pub public_inputs: Vec<u128>,

    /// `winterfell::Proof::to_bytes()` output.
    pub stark_proof: Vec<u8>,
}

impl ProofArtifact {
    pub fn new(engine: &str, public_inputs: Vec<u128>, stark_proof: Vec<u8>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            engine: engine.to_string(),
            public_inputs,
            stark_proof,
        }
    }

    /// Encode into the opaque proof blob.
    pub fn encode(&self) -> EngineResult<ProofBytes> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| EngineError::Fault(format!("Serialization error: {}", e)))?;
        Ok(ProofBytes::new(buf))
    }

    /// Decode a blob, insisting on the current format and the given engine.
    pub fn decode(proof: &ProofBytes, engine: &str) -> EngineResult<Self> {
        let artifact: ProofArtifact = ciborium::de::from_reader(proof.as_bytes())
            .map_err(|e| EngineError::MalformedProof(format!("undecodable artifact: {}", e)))?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(EngineError::MalformedProof(format!(
                "artifact format {} is not supported (expected {})",
                artifact.format_version, FORMAT_VERSION
            )));
        }

        if artifact.engine != engine {
            return Err(EngineError::MalformedProof(format!(
                "artifact was produced by engine '{}', not '{}'",
                artifact.engine, engine
            )));
        }

        Ok(artifact)
    }

    /// Public input at `index`, or `MalformedProof` if the artifact is short.
    pub fn public_input(&self, index: usize) -> EngineResult<u128> {
        self.public_inputs.get(index).copied().ok_or_else(|| {
            EngineError::MalformedProof(format!("missing public input #{}", index))
        })
    }
}
