//! Age-check STARK engine
//!
//! Proves `reference_year - birth_year >= minimum_age` without revealing the
//! birth year. The slack `reference_year - minimum_age - birth_year` is
//! decomposed into bits inside the trace, which is only possible when the
//! slack is non-negative.

use super::{
    artifact::ProofArtifact,
    stark::{self, Coin, Commitment, Hasher, MIXER_SEED},
    traits::{EngineError, EngineResult, ProofBytes, ProofOutput, ProveInput, ProvingEngine},
};
use winter_math::ToElements;
use winterfell::{
    math::{fields::f128::BaseElement, FieldElement},
    matrix::ColMatrix,
    Air, AirContext, Assertion, AuxRandElements, CompositionPoly, CompositionPolyTrace,
    ConstraintCompositionCoefficients, DefaultConstraintCommitment, DefaultConstraintEvaluator,
    DefaultTraceLde, EvaluationFrame, PartitionOptions, ProofOptions, Prover, StarkDomain,
    TraceInfo, TracePolyTable, TraceTable, TransitionConstraintDegree,
};

pub const ENGINE_NAME: &str = "age-check";
pub const TRACE_WIDTH: usize = 5;
pub const DEFAULT_REFERENCE_YEAR: u32 = 2025;
pub const DEFAULT_MINIMUM_AGE: u32 = 18;

/// Row 0 is the start row; rows 1..=15 carry one slack bit each.
const TRACE_LENGTH: usize = 16;
const SLACK_BITS: usize = TRACE_LENGTH - 1;

/// Largest provable gap between the latest allowed birth year and the input.
pub const MAX_SLACK: u32 = (1 << SLACK_BITS) - 1;

/// Public inputs for the age proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgePublicInputs {
    pub reference_year: BaseElement,
    pub minimum_age: BaseElement,
}

impl ToElements<BaseElement> for AgePublicInputs {
    fn to_elements(&self) -> Vec<BaseElement> {
        vec![self.reference_year, self.minimum_age]
    }
}

/// The AIR for the age check
///
/// Execution trace layout (5 columns):
/// - Column 0: mixer (see [`stark::next_mixer`])
/// - Column 1: slack bit (MSB first, 0 in row 0)
/// - Column 2: accumulated slack (acc' = 2 * acc + bit')
/// - Column 3: birth year (private, constant)
/// - Column 4: acc + birth year
///
/// Every witness constraint has the mixer constraint added, so a zero slack
/// (all-zero bit column) still yields full-degree constraints.
pub struct AgeCheckAir {
    context: AirContext<BaseElement>,
    pub_inputs: AgePublicInputs,
}

impl Air for AgeCheckAir {
    type BaseField = BaseElement;
    type PublicInputs = AgePublicInputs;

    fn new(trace_info: TraceInfo, pub_inputs: Self::PublicInputs, options: ProofOptions) -> Self {
        assert_eq!(TRACE_WIDTH, trace_info.width());

        let degrees = vec![
            TransitionConstraintDegree::new(2), // mixer
            TransitionConstraintDegree::new(2), // bit is boolean
            TransitionConstraintDegree::new(2), // accumulator
            TransitionConstraintDegree::new(2), // year is constant
            TransitionConstraintDegree::new(2), // sum = acc + year
        ];

        let context = AirContext::new(trace_info, degrees, 4, options);
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

        result[0] = mix;
        result[1] = next[1] * (next[1] - E::ONE) + mix;
        result[2] = next[2] - (current[2].double() + next[1]) + mix;
        result[3] = next[3] - current[3] + mix;
        result[4] = next[4] - (next[2] + next[3]) + mix;
    }

    fn get_assertions(&self) -> Vec<Assertion<Self::BaseField>> {
        let last_step = self.trace_length() - 1;
        let bound = self.pub_inputs.reference_year - self.pub_inputs.minimum_age;
        vec![
            Assertion::single(0, 0, BaseElement::new(MIXER_SEED)),
            Assertion::single(1, 0, BaseElement::ZERO),
            Assertion::single(2, 0, BaseElement::ZERO),
            Assertion::single(4, last_step, bound),
        ]
    }
}

/// Build the execution trace for a birth year with the given slack.
pub fn build_trace(birth_year: u32, slack: u32) -> TraceTable<BaseElement> {
    let year = BaseElement::new(u128::from(birth_year));
    let mut trace = TraceTable::new(TRACE_WIDTH, TRACE_LENGTH);
    trace.fill(
        |state| {
            state[0] = BaseElement::new(MIXER_SEED);
            state[1] = BaseElement::ZERO;
            state[2] = BaseElement::ZERO;
            state[3] = year;
            state[4] = year;
        },
        |step, state| {
            let bit = BaseElement::new(u128::from((slack >> (SLACK_BITS - 1 - step)) & 1));
            state[0] = stark::next_mixer(state[0]);
            state[1] = bit;
            state[2] = state[2].double() + bit;
            state[4] = state[2] + state[3];
        },
    );
    trace
}

struct AgeCheckProver {
    options: ProofOptions,
    pub_inputs: AgePublicInputs,
}

impl Prover for AgeCheckProver {
    type BaseField = BaseElement;
    type Air = AgeCheckAir;
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

    // The trace holds the private year, not the public statement.
    fn get_pub_inputs(&self, _trace: &Self::Trace) -> AgePublicInputs {
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

/// Engine proving a minimum age at a fixed reference year.
#[derive(Debug, Clone)]
pub struct AgeCheckEngine {
    reference_year: u32,
    minimum_age: u32,
}

impl AgeCheckEngine {
    pub fn new(reference_year: u32, minimum_age: u32) -> Self {
        Self {
            reference_year,
            minimum_age,
        }
    }

    fn pub_inputs(&self) -> AgePublicInputs {
        AgePublicInputs {
            reference_year: BaseElement::new(u128::from(self.reference_year)),
            minimum_age: BaseElement::new(u128::from(self.minimum_age)),
        }
    }

    fn statement(&self) -> String {
        format!("age >= {} in {}", self.minimum_age, self.reference_year)
    }

    fn prove_birth_year(&self, birth_year: u32) -> EngineResult<ProofOutput> {
        let latest_year = self.reference_year.saturating_sub(self.minimum_age);
        let slack = latest_year.checked_sub(birth_year).ok_or_else(|| {
            EngineError::Fault(format!(
                "birth year does not satisfy {}",
                self.statement()
            ))
        })?;
        if slack > MAX_SLACK {
            return Err(EngineError::Fault(format!(
                "birth year {} is out of the provable range",
                birth_year
            )));
        }

        let prover = AgeCheckProver {
            options: stark::proof_options(),
            pub_inputs: self.pub_inputs(),
        };
        let proof = prover
            .prove(build_trace(birth_year, slack))
            .map_err(|e| EngineError::Fault(format!("Proving error: {}", e)))?;

        let artifact = ProofArtifact::new(
            ENGINE_NAME,
            vec![
                u128::from(self.reference_year),
                u128::from(self.minimum_age),
            ],
            proof.to_bytes(),
        );

        Ok(ProofOutput::new(
            ENGINE_NAME,
            artifact.encode()?,
            Some(self.statement()),
        ))
    }
}

impl Default for AgeCheckEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_YEAR, DEFAULT_MINIMUM_AGE)
    }
}

impl ProvingEngine for AgeCheckEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn initialize(&mut self) -> EngineResult<()> {
        if self.minimum_age >= self.reference_year {
            return Err(EngineError::Fault(format!(
                "minimum age {} must be below reference year {}",
                self.minimum_age, self.reference_year
            )));
        }
        Ok(())
    }

    fn prove(&mut self, input: &ProveInput) -> EngineResult<ProofOutput> {
        match input {
            ProveInput::BirthYear(year) => self.prove_birth_year(*year),
            other => Err(EngineError::Fault(format!(
                "{} engine cannot prove {}",
                ENGINE_NAME, other
            ))),
        }
    }

    fn verify(&self, proof: &ProofBytes) -> EngineResult<bool> {
        let artifact = ProofArtifact::decode(proof, ENGINE_NAME)?;
        let reference_year = artifact.public_input(0)?;
        let minimum_age = artifact.public_input(1)?;

        // A sound proof of a different statement is still not what we asked.
        if reference_year != u128::from(self.reference_year)
            || minimum_age != u128::from(self.minimum_age)
        {
            return Ok(false);
        }

        stark::verify_stark::<AgeCheckAir>(&artifact.stark_proof, self.pub_inputs())
    }
}
