//! Shared winterfell plumbing for the concrete engines.

use super::traits::{EngineError, EngineResult};
use tracing::debug;
use winterfell::{
    crypto::{hashers::Blake3_256, DefaultRandomCoin, MerkleTree},
    math::{fields::f128::BaseElement, FieldElement},
    AcceptableOptions, Air, BatchingMethod, FieldExtension, Proof, ProofOptions,
};

pub type Hasher = Blake3_256<BaseElement>;
pub type Coin = DefaultRandomCoin<Hasher>;
pub type Commitment = MerkleTree<Hasher>;

/// Proof parameters shared by every engine in this crate.
///
/// 32 queries at blowup 8 gives ~96 bits of conjectured security.
pub fn proof_options() -> ProofOptions {
    ProofOptions::new(
        32, // number of queries
        8,  // blowup factor
        0,  // grinding factor
        FieldExtension::None,
        4,  // FRI folding factor
        31, // FRI max remainder degree (must be 2^n - 1)
        BatchingMethod::Linear,
        BatchingMethod::Linear,
    )
}

/// First value of the mixer column.
pub const MIXER_SEED: u128 = 3;

/// Additive constant of the mixer recurrence `r' = r^2 + MIXER_STEP`.
pub const MIXER_STEP: u128 = 7;

/// Next value of the mixer column.
///
/// Engines whose witness columns can be constant or all zero carry a mixer
/// column and add [`mixer_transition`] to every witness constraint. The
/// mixer is full degree for any witness, so the trace and every constraint
/// keep the degree the AIR declares.
pub fn next_mixer(r: BaseElement) -> BaseElement {
    r.square() + BaseElement::new(MIXER_STEP)
}

/// Transition constraint of the mixer column (degree 2).
pub fn mixer_transition<E>(current: E, next: E) -> E
where
    E: FieldElement + From<BaseElement>,
{
    next - (current.square() + E::from(BaseElement::new(MIXER_STEP)))
}

/// Verify serialized winterfell proof bytes against an AIR's public inputs.
///
/// Bytes that do not parse are `MalformedProof`; a parsed proof that fails
/// verification is `Ok(false)`.
pub fn verify_stark<A>(stark_proof: &[u8], pub_inputs: A::PublicInputs) -> EngineResult<bool>
where
    A: Air<BaseField = BaseElement>,
{
    let proof = Proof::from_bytes(stark_proof)
        .map_err(|e| EngineError::MalformedProof(format!("undecodable STARK proof: {}", e)))?;

    let acceptable = AcceptableOptions::OptionSet(vec![proof_options()]);
    match winterfell::verify::<A, Hasher, Coin, Commitment>(proof, pub_inputs, &acceptable) {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!(error = %e, "STARK verification rejected proof");
            Ok(false)
        }
    }
}
