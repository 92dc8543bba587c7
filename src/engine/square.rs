//! Guest-square STARK engine
//!
//! Runs the built-in "square" guest: proves knowledge of a private argument
//! `x` with `x * x = y`, where `y` is public. The proof is bound to the guest
//! image through its image id, so a proof made for one image does not verify
//! against another.
//!
//! The trace rebuilds `x` from its bits MSB first and tracks `x^2` alongside:
//!
//! ```text
//! p' = 2p + b'
//! q' = 4q + 4p b' + b'    (= p'^2 for boolean b')
//! ```

use super::{
    artifact::ProofArtifact,
    stark::{self, Coin, Commitment, Hasher, MIXER_SEED},
    traits::{
        EngineError, EngineResult, GuestImage, ProofBytes, ProofOutput, ProveInput, ProvingEngine,
    },
};
use tracing::debug;
use winter_math::ToElements;
use winterfell::{
    math::{fields::f128::BaseElement, FieldElement},
    matrix::ColMatrix,
    Air, AirContext, Assertion, AuxRandElements, CompositionPoly, CompositionPolyTrace,
    ConstraintCompositionCoefficients, DefaultConstraintCommitment, DefaultConstraintEvaluator,
    DefaultTraceLde, EvaluationFrame, PartitionOptions, ProofOptions, Prover, StarkDomain,
    TraceInfo, TracePolyTable, TraceTable, TransitionConstraintDegree,
};

pub const ENGINE_NAME: &str = "guest-square";
pub const TRACE_WIDTH: usize = 4;

/// Built-in guest image. Its SHA-256 prefix is the image id every proof
/// from a default engine is bound to.
pub const BUILTIN_GUEST: &[u8] = b"local-prover/guest/square/v1";

/// Row 0 is the start row; rows 1..=31 carry one argument bit each.
const TRACE_LENGTH: usize = 32;
const ARGUMENT_BITS: usize = TRACE_LENGTH - 1;

/// Public inputs for the square proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquarePublicInputs {
    pub image_id: BaseElement,
    pub square: BaseElement,
}

impl ToElements<BaseElement> for SquarePublicInputs {
    fn to_elements(&self) -> Vec<BaseElement> {
        vec![self.image_id, self.square]
    }
}

/// The AIR for the guest square
///
/// Execution trace layout (4 columns):
/// - Column 0: mixer (see [`stark::next_mixer`])
/// - Column 1: argument bit (MSB first, 0 in row 0)
/// - Column 2: argument prefix p
/// - Column 3: square of the prefix q
pub struct SquareAir {
    context: AirContext<BaseElement>,
    pub_inputs: SquarePublicInputs,
}

impl Air for SquareAir {
    type BaseField = BaseElement;
    type PublicInputs = SquarePublicInputs;

    fn new(trace_info: TraceInfo, pub_inputs: Self::PublicInputs, options: ProofOptions) -> Self {
        assert_eq!(TRACE_WIDTH, trace_info.width());

        let degrees = vec![
            TransitionConstraintDegree::new(2), // mixer
            TransitionConstraintDegree::new(2), // bit is boolean
            TransitionConstraintDegree::new(2), // prefix
            TransitionConstraintDegree::new(2), // square of prefix
        ];

        let context = AirContext::new(trace_info, degrees, 5, options);
        Self {
            context,
            pub_inputs,
        }
    }

    fn context(&self) -> &AirContext<Self::BaseField> {
        &self.context
    }

    fn evaluate_transition<E: FieldElement + From<Self::BaseField>>(
        &self,
        frame: &EvaluationFrame<E>,
        _periodic_values: &[E],
        result: &mut [E],
    ) {
        let current = frame.current();
        let next = frame.next();
        let mix = stark::mixer_transition(current[0], next[0]);
        let four = E::from(BaseElement::new(4));

        result[0] = mix;
        result[1] = next[1] * (next[1] - E::ONE) + mix;
        result[2] = next[2] - (current[2].double() + next[1]) + mix;
        result[3] = next[3] - (four * current[3] + four * current[2] * next[1] + next[1]) + mix;
    }

    fn get_assertions(&self) -> Vec<Assertion<Self::BaseField>> {
        let last_step = self.trace_length() - 1;
        vec![
            Assertion::single(0, 0, BaseElement::new(MIXER_SEED)),
            Assertion::single(1, 0, BaseElement::ZERO),
            Assertion::single(2, 0, BaseElement::ZERO),
            Assertion::single(3, 0, BaseElement::ZERO),
            Assertion::single(3, last_step, self.pub_inputs.square),
        ]
    }
}

/// Build the execution trace for `argument`.
pub fn build_trace(argument: u32) -> TraceTable<BaseElement> {
    let mut trace = TraceTable::new(TRACE_WIDTH, TRACE_LENGTH);
    trace.fill(
        |state| {
            state[0] = BaseElement::new(MIXER_SEED);
            state[1] = BaseElement::ZERO;
            state[2] = BaseElement::ZERO;
            state[3] = BaseElement::ZERO;
        },
        |step, state| {
            let shift = ARGUMENT_BITS - 1 - step;
            let bit = BaseElement::new(u128::from((argument >> shift) & 1));
            let four = BaseElement::new(4);
            state[0] = stark::next_mixer(state[0]);
            state[1] = bit;
            state[3] = four * state[3] + four * state[2] * bit + bit;
            state[2] = state[2].double() + bit;
        },
    );
    trace
}

struct SquareProver {
    options: ProofOptions,
    pub_inputs: SquarePublicInputs,
}

impl Prover for SquareProver {
    type BaseField = BaseElement;
    type Air = SquareAir;
    type Trace = TraceTable<Self::BaseField>;

    type HashFn = Hasher;
    type VC = Commitment;
    type RandomCoin = Coin;

    type TraceLde<E: FieldElement<BaseField = Self::BaseField>> =
        DefaultTraceLde<E, Self::HashFn, Self::VC>;

    type ConstraintCommitment<E: FieldElement<BaseField = Self::BaseField>> =
        DefaultConstraintCommitment<E, Self::HashFn, Self::VC>;

    type ConstraintEvaluator<'a, E: FieldElement<BaseField = Self::BaseField>> =
        DefaultConstraintEvaluator<'a, Self::Air, E>;

    // The image id is not in the trace.
    fn get_pub_inputs(&self, _trace: &Self::Trace) -> SquarePublicInputs {
        self.pub_inputs
    }

    fn options(&self) -> &ProofOptions {
        &self.options
    }

    fn new_trace_lde<E: FieldElement<BaseField = Self::BaseField>>(
        &self,
        trace_info: &TraceInfo,
        main_trace: &ColMatrix<Self::BaseField>,
        domain: &StarkDomain<Self::BaseField>,
        partition_option: PartitionOptions,
    ) -> (Self::TraceLde<E>, TracePolyTable<E>) {
        DefaultTraceLde::new(trace_info, main_trace, domain, partition_option)
    }

    fn build_constraint_commitment<E: FieldElement<BaseField = Self::BaseField>>(
        &self,
        composition_poly_trace: CompositionPolyTrace<E>,
        num_constraint_composition_columns: usize,
        domain: &StarkDomain<Self::BaseField>,
        partition_options: PartitionOptions,
    ) -> (Self::ConstraintCommitment<E>, CompositionPoly<E>) {
        DefaultConstraintCommitment::new(
            composition_poly_trace,
            num_constraint_composition_columns,
            domain,
            partition_options,
        )
    }

    fn new_evaluator<'a, E: FieldElement<BaseField = Self::BaseField>>(
        &self,
        air: &'a Self::Air,
        aux_rand_elements: Option<AuxRandElements<E>>,
        composition_coefficients: ConstraintCompositionCoefficients<E>,
    ) -> Self::ConstraintEvaluator<'a, E> {
        DefaultConstraintEvaluator::new(air, aux_rand_elements, composition_coefficients)
    }
}

/// Engine running one guest image that squares its argument.
#[derive(Debug, Clone)]
pub struct SquareEngine {
    image: GuestImage,
}

impl SquareEngine {
    pub fn new(image: GuestImage) -> Self {
        Self { image }
    }

    /// The guest image this engine runs.
    pub fn image(&self) -> &GuestImage {
        &self.image
    }

    fn prove_square(&self, image: &GuestImage, argument: u32) -> EngineResult<ProofOutput> {
        if image.image_id() != self.image.image_id() {
            return Err(EngineError::Fault(format!(
                "guest image {:032x} is not the loaded program {:032x}",
                image.image_id(),
                self.image.image_id()
            )));
        }

        let square = argument
            .checked_mul(argument)
            .ok_or_else(|| EngineError::Fault("Overflow".to_string()))?;

        let image_id = self.image.image_id();
        let prover = SquareProver {
            options: stark::proof_options(),
            pub_inputs: SquarePublicInputs {
                image_id: BaseElement::new(image_id),
                square: BaseElement::new(u128::from(square)),
            },
        };
        let proof = prover
            .prove(build_trace(argument))
            .map_err(|e| EngineError::Fault(format!("Proving error: {}", e)))?;

        let artifact = ProofArtifact::new(
            ENGINE_NAME,
            vec![image_id, u128::from(square)],
            proof.to_bytes(),
        );

        Ok(ProofOutput::new(
            ENGINE_NAME,
            artifact.encode()?,
            Some(square.to_string()),
        ))
    }
}

impl Default for SquareEngine {
    fn default() -> Self {
        Self::new(GuestImage::new(BUILTIN_GUEST.to_vec()))
    }
}

impl ProvingEngine for SquareEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn initialize(&mut self) -> EngineResult<()> {
        if self.image.is_empty() {
            return Err(EngineError::Fault("guest image is empty".to_string()));
        }
        debug!(
            image_id = %format!("{:032x}", self.image.image_id()),
            image_size = self.image.len(),
            "guest image loaded"
        );
        Ok(())
    }

    fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput> {
        match input {
            ProveInput::Guest { image, argument } => self.prove_square(image, *argument),
            other => Err(EngineError::Fault(format!(
                "{} engine cannot prove {}",
                ENGINE_NAME, other
            ))),
        }
    }

    fn verify(&self, proof: &ProofBytes) -> EngineResult<bool> {
        let artifact = ProofArtifact::decode(proof, ENGINE_NAME)?;
        let image_id = artifact.public_input(0)?;
        let square = artifact.public_input(1)?;

        if image_id != self.image.image_id() {
            return Ok(false);
        }
        if square > u128::from(u32::MAX) {
            return Err(EngineError::MalformedProof(
                "public output does not fit the guest's u32".to_string(),
            ));
        }

        let pub_inputs = SquarePublicInputs {
            image_id: BaseElement::new(image_id),
            square: BaseElement::new(square),
        };
        stark::verify_stark::<SquareAir>(&artifact.stark_proof, pub_inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(argument: u32) -> ProveInput {
        ProveInput::Guest {
            image: GuestImage::new(BUILTIN_GUEST.to_vec()),
            argument,
        }
    }

    #[test]
    fn test_trace_building() {
        let trace = build_trace(17);
        let last = TRACE_LENGTH - 1;

        assert_eq!(trace.get(0, 0), BaseElement::new(MIXER_SEED));
        assert_eq!(trace.get(2, last), BaseElement::new(17));
        assert_eq!(trace.get(3, last), BaseElement::new(289));

        // Every row holds the square of its prefix.
        for row in 0..TRACE_LENGTH {
            let prefix = trace.get(2, row);
            assert_eq!(trace.get(3, row), prefix * prefix);
        }
    }

    #[test]
    fn test_square_air_creation() {
        let trace_info = TraceInfo::new(TRACE_WIDTH, TRACE_LENGTH);
        let pub_inputs = SquarePublicInputs {
            image_id: BaseElement::new(1),
            square: BaseElement::new(289),
        };
        let air = SquareAir::new(trace_info, pub_inputs, stark::proof_options());
        assert_eq!(air.trace_length(), TRACE_LENGTH);
        assert_eq!(air.get_assertions().len(), 5);
    }

    #[test]
    fn test_prove_and_verify_seventeen() {
        let mut engine = SquareEngine::default();
        engine.initialize().unwrap();

        let output = engine.prove(&guest(17)).expect("prove");
        assert_eq!(output.metadata.public_output.as_deref(), Some("289"));
        assert_eq!(engine.verify(&output.proof), Ok(true));
        assert_eq!(engine.verify(&output.proof), Ok(true));
    }

    #[test]
    fn test_prove_edges() {
        let mut engine = SquareEngine::default();
        for argument in [0, 1, u32::from(u16::MAX)] {
            let output = engine.prove(&guest(argument)).expect("prove");
            assert_eq!(engine.verify(&output.proof), Ok(true), "argument {}", argument);
        }
    }

    #[test]
    fn test_overflow_is_a_fault() {
        let mut engine = SquareEngine::default();
        assert_eq!(
            engine.prove(&guest(65536)).unwrap_err(),
            EngineError::Fault("Overflow".to_string())
        );
    }

    #[test]
    fn test_foreign_image_is_refused() {
        let mut engine = SquareEngine::default();
        let input = ProveInput::Guest {
            image: GuestImage::new(b"another guest".to_vec()),
            argument: 3,
        };
        assert!(matches!(engine.prove(&input), Err(EngineError::Fault(_))));
    }

    #[test]
    fn test_proof_is_bound_to_image() {
        let mut engine = SquareEngine::default();
        let output = engine.prove(&guest(5)).expect("prove");

        let other = SquareEngine::new(GuestImage::new(b"another guest".to_vec()));
        assert_eq!(other.verify(&output.proof), Ok(false));
    }

    #[test]
    fn test_tampered_square_fails() {
        let mut engine = SquareEngine::default();
        let output = engine.prove(&guest(5)).expect("prove");

        let mut artifact = ProofArtifact::decode(&output.proof, ENGINE_NAME).unwrap();
        artifact.public_inputs[1] = 26;
        assert_eq!(engine.verify(&artifact.encode().unwrap()), Ok(false));
    }

    #[test]
    fn test_initialize_rejects_empty_image() {
        assert!(SquareEngine::new(GuestImage::default()).initialize().is_err());
    }
}
