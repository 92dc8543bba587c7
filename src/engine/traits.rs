//! Trait abstraction for proving engines.
//!
//! The orchestration layer only ever talks to an engine through
//! [`ProvingEngine`]. Concrete engines (squared Fibonacci, age check, guest
//! square, compiled-program mock) and the test mock all sit behind this seam.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Input handed to an engine's `prove`.
///
/// The payload is session-specific. Each sample application produces exactly
/// one kind of input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProveInput {
    /// Second starting value of the squared-Fibonacci sequence.
    Seed(u32),
    /// Private birth year for the age check.
    BirthYear(u32),
    /// Guest program image plus its private argument.
    Guest { image: GuestImage, argument: u32 },
    /// Compiled program as JSON text.
    JsonProgram(String),
}

impl fmt::Display for ProveInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed(seed) => write!(f, "seed {}", seed),
            // The year itself is private; never print it.
            Self::BirthYear(_) => write!(f, "birth year (private)"),
            Self::Guest { image, .. } => {
                write!(f, "guest {:032x} (private argument)", image.image_id())
            }
            Self::JsonProgram(program) => write!(f, "program ({} bytes)", program.len()),
        }
    }
}

/// Guest program bytes, identified by their image id.
///
/// Carried over the worker channel as a lowercase hex string.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct GuestImage(Vec<u8>);

impl GuestImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 16 bytes of the image's SHA-256, as a field-sized integer.
    ///
    /// Always below 2^120, so it is a canonical element of the f128 field.
    pub fn image_id(&self) -> u128 {
        let digest = Sha256::digest(&self.0);
        let mut id = [0u8; 16];
        id[1..].copy_from_slice(&digest[..15]);
        u128::from_be_bytes(id)
    }
}

impl fmt::Debug for GuestImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestImage({} bytes, {:032x})", self.0.len(), self.image_id())
    }
}

impl Serialize for GuestImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for GuestImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Opaque proof blob produced by an engine.
///
/// Carried over the worker channel as a lowercase hex string.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ProofBytes(Vec<u8>);

impl ProofBytes {
    /// Wrap raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size of the proof in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the proof is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the proof bytes, hex encoded.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.0))
    }

    /// Hex preview of the first `n` bytes, space separated.
    pub fn preview(&self, n: usize) -> String {
        self.0
            .iter()
            .take(n)
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Consume into raw bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ProofBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ProofBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofBytes({} bytes, {})", self.0.len(), self.preview(8))
    }
}

impl Serialize for ProofBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ProofBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Engine-reported fields that accompany a proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofMetadata {
    /// Engine that produced the proof.
    pub engine: String,

    /// Wall-clock proving time in milliseconds (filled in by the binding).
    pub time_ms: f64,

    /// Public output of the statement, if the engine exposes one.
    pub public_output: Option<String>,

    /// Size of the proof in bytes.
    pub proof_size: usize,
}

/// What `prove` hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofOutput {
    pub proof: ProofBytes,
    pub metadata: ProofMetadata,
}

impl ProofOutput {
    /// Build an output, deriving the size field from the proof.
    pub fn new(engine: &str, proof: ProofBytes, public_output: Option<String>) -> Self {
        let proof_size = proof.len();
        Self {
            proof,
            metadata: ProofMetadata {
                engine: engine.to_string(),
                time_ms: 0.0,
                public_output,
                proof_size,
            },
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("{0}")]
    Fault(String),
}

/// Capability surface of a proving engine.
///
/// `prove` and `verify` are heavy and synchronous: they occupy the calling
/// thread for their whole duration. Lifecycle rules (initialize before use,
/// precompute at most once) are enforced by
/// [`EngineBinding`](super::binding::EngineBinding), not by implementors.
pub trait ProvingEngine: Send + 'static {
    /// Short engine identifier, also embedded in proof artifacts.
    fn name(&self) -> &'static str;

    /// Load the engine.
    fn initialize(&mut self) -> EngineResult<()>;

    /// Optional warm-up after `initialize`.
    fn precompute(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Generate a proof for `input`.
    fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput>;

    /// Check a proof produced by `prove` of the same engine version.
    fn verify(&self, proof: &ProofBytes) -> EngineResult<bool>;
}
