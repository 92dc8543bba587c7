//! Property-based tests for the proving engines
//!
//! Tests for:
//! - Completeness: every accepted input produces a verifying proof
//! - Idempotence: verifying the same proof twice gives the same answer
//! - Robustness: corrupted or truncated proofs never crash the caller

use super::{
    age_check::{self, AgeCheckEngine},
    fibonacci::{self, FibonacciEngine},
    square::{self, SquareEngine},
    EngineBinding, EngineError, GuestImage, ProofBytes, ProveInput,
};
use crate::session::DEFAULT_EARLIEST_YEAR;
use proptest::prelude::*;
use std::sync::OnceLock;

fn fibonacci_binding() -> EngineBinding {
    let mut binding = EngineBinding::new(Box::new(FibonacciEngine::new(
        fibonacci::MIN_TRACE_LENGTH,
    )));
    binding.initialize().unwrap();
    binding
}

// One real proof, shared by the corruption properties.
fn sample_proof() -> &'static ProofBytes {
    static PROOF: OnceLock<ProofBytes> = OnceLock::new();
    PROOF.get_or_init(|| {
        fibonacci_binding()
            .prove(&ProveInput::Seed(12345))
            .unwrap()
            .proof
    })
}

/// Completeness (age check), exhaustively over every year the default
/// validator accepts, including the zero-slack boundary 2007.
#[test]
fn test_age_check_complete_for_every_accepted_year() {
    let mut binding = EngineBinding::new(Box::new(AgeCheckEngine::default()));
    binding.initialize().unwrap();

    let failing: Vec<_> = (DEFAULT_EARLIEST_YEAR..=2007)
        .filter(|year| {
            let verified = binding
                .prove(&ProveInput::BirthYear(*year))
                .and_then(|output| binding.verify(&output.proof));
            verified != Ok(true)
        })
        .collect();
    assert!(failing.is_empty(), "years that did not prove: {:?}", failing);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Property test: Completeness (squared Fibonacci)
    #[test]
    fn prop_fibonacci_completeness(seed in any::<u32>()) {
        let mut binding = fibonacci_binding();
        let output = binding.prove(&ProveInput::Seed(seed)).unwrap();

        prop_assert_eq!(binding.verify(&output.proof), Ok(true));
        prop_assert_eq!(binding.verify(&output.proof), Ok(true));
        prop_assert_eq!(output.metadata.engine.as_str(), fibonacci::ENGINE_NAME);
    }

    /// Property test: Completeness (age check)
    /// Every year old enough and inside the 15-bit window proves.
    #[test]
    fn prop_age_check_completeness(birth_year in 1875u32..=2007) {
        let mut binding = EngineBinding::new(Box::new(AgeCheckEngine::default()));
        binding.initialize().unwrap();

        let output = binding.prove(&ProveInput::BirthYear(birth_year)).unwrap();
        prop_assert_eq!(output.metadata.engine.as_str(), age_check::ENGINE_NAME);
        prop_assert_eq!(binding.verify(&output.proof), Ok(true));
    }

    /// Property test: Completeness (guest square)
    /// Every argument whose square fits a u32 proves, and the public output
    /// is the square.
    #[test]
    fn prop_square_completeness(argument in 0u32..=65535) {
        let mut binding = EngineBinding::new(Box::new(SquareEngine::default()));
        binding.initialize().unwrap();

        let input = ProveInput::Guest {
            image: GuestImage::new(square::BUILTIN_GUEST.to_vec()),
            argument,
        };
        let output = binding.prove(&input).unwrap();
        let expected = (argument * argument).to_string();
        prop_assert_eq!(output.metadata.public_output.as_deref(), Some(expected.as_str()));
        prop_assert_eq!(binding.verify(&output.proof), Ok(true));
    }

    /// Property test: Refusal of under-age years happens before any proving
    #[test]
    fn prop_age_check_refuses_minors(birth_year in 2008u32..=2025) {
        let mut binding = EngineBinding::new(Box::new(AgeCheckEngine::default()));
        binding.initialize().unwrap();

        let result = binding.prove(&ProveInput::BirthYear(birth_year));
        prop_assert!(matches!(result, Err(EngineError::Fault(_))));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property test: Corruption
    /// A flipped byte yields a verdict or MalformedProof, never another error.
    #[test]
    fn prop_corrupted_proof_never_crashes(index in any::<prop::sample::Index>(), mask in 1u8..=255) {
        let binding = fibonacci_binding();
        let mut bytes = sample_proof().as_bytes().to_vec();
        let i = index.index(bytes.len());
        bytes[i] ^= mask;

        let result = binding.verify(&ProofBytes::new(bytes));
        prop_assert!(
            matches!(result, Ok(_) | Err(EngineError::MalformedProof(_))),
            "unexpected verify outcome: {:?}", result
        );
    }

    /// Property test: Truncation
    /// Any strict prefix of a proof is malformed.
    #[test]
    fn prop_truncated_proof_is_malformed(index in any::<prop::sample::Index>()) {
        let binding = fibonacci_binding();
        let full = sample_proof().as_bytes();
        let cut = index.index(full.len());

        let result = binding.verify(&ProofBytes::new(full[..cut].to_vec()));
        prop_assert!(matches!(result, Err(EngineError::MalformedProof(_))));
    }
}
