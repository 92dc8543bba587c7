//! Squared-Fibonacci STARK engine
//!
//! Proves knowledge of a private seed `s` such that the sequence
//!
//! ```text
//! a_0 = 1, b_0 = s, a_{i+1} = b_i, b_{i+1} = a_i^2 + b_i^2
//! ```
//!
//! ends in a public value after `trace_length - 1` steps. The seed never
//! leaves the prover; the final value is reported as the public output.

use super::{
    artifact::ProofArtifact,
    stark::{self, Coin, Commitment, Hasher},
    traits::{EngineError, EngineResult, ProofBytes, ProofOutput, ProveInput, ProvingEngine},
};
use tracing::debug;
use winter_math::ToElements;
use winterfell::{
    math::{fields::f128::BaseElement, FieldElement, StarkField},
    matrix::ColMatrix,
    Air, AirContext, Assertion, AuxRandElements, CompositionPoly, CompositionPolyTrace,
    ConstraintCompositionCoefficients, DefaultConstraintCommitment, DefaultConstraintEvaluator,
    DefaultTraceLde, EvaluationFrame, PartitionOptions, ProofOptions, Prover, StarkDomain, Trace,
    TraceInfo, TracePolyTable, TraceTable, TransitionConstraintDegree,
};

pub const ENGINE_NAME: &str = "fibonacci-squares";
pub const TRACE_WIDTH: usize = 2;
pub const DEFAULT_TRACE_LENGTH: usize = 32;
pub const MIN_TRACE_LENGTH: usize = 8;

/// Public inputs for the squared-Fibonacci proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciPublicInputs {
    pub start: BaseElement,
    pub result: BaseElement,
}

impl ToElements<BaseElement> for FibonacciPublicInputs {
    fn to_elements(&self) -> Vec<BaseElement> {
        vec![self.start, self.result]
    }
}

/// The AIR for the squared-Fibonacci sequence
///
/// Execution trace layout (2 columns):
/// - Column 0: a_i
/// - Column 1: b_i
pub struct FibonacciAir {
    context: AirContext<BaseElement>,
    pub_inputs: FibonacciPublicInputs,
}

impl Air for FibonacciAir {
    type BaseField = BaseElement;
    type PublicInputs = FibonacciPublicInputs;

    fn new(trace_info: TraceInfo, pub_inputs: Self::PublicInputs, options: ProofOptions) -> Self {
        assert_eq!(TRACE_WIDTH, trace_info.width());

        let degrees = vec![
            TransitionConstraintDegree::new(1), // a' = b
            TransitionConstraintDegree::new(2), // b' = a^2 + b^2
        ];

        let context = AirContext::new(trace_info, degrees, 2, options);
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

        result[0] = next[0] - current[1];
        result[1] = next[1] - (current[0].square() + current[1].square());
    }

    fn get_assertions(&self) -> Vec<Assertion<Self::BaseField>> {
        let last_step = self.trace_length() - 1;
        vec![
            Assertion::single(0, 0, self.pub_inputs.start),
            Assertion::single(1, last_step, self.pub_inputs.result),
        ]
    }
}

/// Build the execution trace for `seed`.
pub fn build_trace(seed: u32, trace_length: usize) -> TraceTable<BaseElement> {
    let mut trace = TraceTable::new(TRACE_WIDTH, trace_length);
    trace.fill(
        |state| {
            state[0] = BaseElement::ONE;
            state[1] = BaseElement::new(u128::from(seed));
        },
        |_, state| {
            let next = state[0].square() + state[1].square();
            state[0] = state[1];
            state[1] = next;
        },
    );
    trace
}

struct FibonacciProver {
    options: ProofOptions,
}

impl Prover for FibonacciProver {
    type BaseField = BaseElement;
    type Air = FibonacciAir;
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

    fn get_pub_inputs(&self, trace: &Self::Trace) -> FibonacciPublicInputs {
        let last_step = trace.length() - 1;
        FibonacciPublicInputs {
            start: trace.get(0, 0),
            result: trace.get(1, last_step),
        }
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

/// Engine proving squared-Fibonacci runs from a private seed.
#[derive(Debug, Clone)]
pub struct FibonacciEngine {
    trace_length: usize,
}

impl FibonacciEngine {
    pub fn new(trace_length: usize) -> Self {
        Self { trace_length }
    }

    pub fn trace_length(&self) -> usize {
        self.trace_length
    }

    fn prove_seed(&self, seed: u32) -> EngineResult<ProofOutput> {
        let trace = build_trace(seed, self.trace_length);
        let start = trace.get(0, 0);
        let result = trace.get(1, self.trace_length - 1);

        let prover = FibonacciProver {
            options: stark::proof_options(),
        };
        let proof = prover
            .prove(trace)
            .map_err(|e| EngineError::Fault(format!("Proving error: {}", e)))?;

        let artifact = ProofArtifact::new(
            ENGINE_NAME,
            vec![start.as_int(), result.as_int()],
            proof.to_bytes(),
        );

        Ok(ProofOutput::new(
            ENGINE_NAME,
            artifact.encode()?,
            Some(result.as_int().to_string()),
        ))
    }
}

impl Default for FibonacciEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_LENGTH)
    }
}

impl ProvingEngine for FibonacciEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn initialize(&mut self) -> EngineResult<()> {
        if !self.trace_length.is_power_of_two() || self.trace_length < MIN_TRACE_LENGTH {
            return Err(EngineError::Fault(format!(
                "trace length must be a power of two >= {}, got {}",
                MIN_TRACE_LENGTH, self.trace_length
            )));
        }
        Ok(())
    }

    /// Self-test round trip; also warms up allocator and hash tables.
    fn precompute(&mut self) -> EngineResult<()> {
        let output = self.prove_seed(1)?;
        if !self.verify(&output.proof)? {
            return Err(EngineError::Fault(
                "self-test proof failed verification".to_string(),
            ));
        }
        debug!(proof_size = output.proof.len(), "fibonacci self-test passed");
        Ok(())
    }

    fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput> {
        match input {
            ProveInput::Seed(seed) => self.prove_seed(*seed),
            other => Err(EngineError::Fault(format!(
                "{} engine cannot prove {}",
                ENGINE_NAME, other
            ))),
        }
    }

    fn verify(&self, proof: &ProofBytes) -> EngineResult<bool> {
        let artifact = ProofArtifact::decode(proof, ENGINE_NAME)?;
        let start = artifact.public_input(0)?;
        let result = artifact.public_input(1)?;

        // The statement fixes a_0 = 1; anything else is a different claim.
        if start != 1 {
            return Ok(false);
        }
        if result >= BaseElement::MODULUS {
            return Err(EngineError::MalformedProof(
                "public output is not a canonical field element".to_string(),
            ));
        }

        let pub_inputs = FibonacciPublicInputs {
            start: BaseElement::ONE,
            result: BaseElement::new(result),
        };
        stark::verify_stark::<FibonacciAir>(&artifact.stark_proof, pub_inputs)
    }
}
