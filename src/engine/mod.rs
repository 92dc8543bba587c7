//! Proving engines and the binding that guards their lifecycle.
//!
//! Engines are heavy and synchronous. The orchestration layer never calls
//! them directly; it goes through an [`EngineBinding`], which is owned by the
//! background worker (for proving) or by the session (for verification).
//!
//! ## Engines
//! - `fibonacci-squares`: a' = b, b' = a^2 + b^2 from a private seed
//! - `age-check`: minimum age at a reference year from a private birth year
//! - `guest-square`: `x * x = y` for a private argument, bound to a guest image
//! - `cairo-mock`: commitment-only proofs of compiled JSON programs
//! - `mock`: scriptable engine for tests

pub mod age_check;
pub mod artifact;
pub mod binding;
pub mod cairo;
pub mod fibonacci;
pub mod mock;
pub mod square;
pub mod stark;
pub mod traits;

#[cfg(test)]
mod proptests;

use std::sync::Arc;

pub use age_check::AgeCheckEngine;
pub use binding::EngineBinding;
pub use cairo::CairoMockEngine;
pub use fibonacci::FibonacciEngine;
pub use mock::{MockEngine, MockGate};
pub use square::SquareEngine;
pub use traits::{
    EngineError, EngineResult, GuestImage, ProofBytes, ProofMetadata, ProofOutput, ProveInput,
    ProvingEngine,
};

/// Builds a fresh engine instance.
///
/// A session calls it twice: once for the worker thread and once for its
/// own verification binding, so no engine state is shared across contexts.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn ProvingEngine> + Send + Sync>;

/// Factory for a cloneable engine value.
pub fn factory<E>(engine: E) -> EngineFactory
where
    E: ProvingEngine + Clone + Sync,
{
    Arc::new(move || Box::new(engine.clone()) as Box<dyn ProvingEngine>)
}
