//! End-to-end session flows over a real worker thread.
//!
//! Covers the user-visible scenarios: an accepted age proof, a locally
//! rejected year, a duplicate submission, and an engine fault, plus timeout,
//! teardown and isolation between sessions. The guest-square and compiled
//! program workloads get one accepted and one rejected flow each.

use local_prover::engine::{
    self, square, AgeCheckEngine, CairoMockEngine, FibonacciEngine, GuestImage, MockEngine,
    SquareEngine,
};
use local_prover::session::{
    BirthYearValidator, JsonProgramValidator, SeedValidator, Session, SessionError,
    SessionOptions, SquareValidator, VerificationState,
};
use local_prover::view::Lifecycle;
use std::time::Duration;

fn age_session(factory: &engine::EngineFactory) -> Session {
    Session::spawn(
        factory,
        Box::new(BirthYearValidator::new(1875, 2025, 18)),
        SessionOptions::default(),
    )
    .unwrap()
}

fn mock_session(mock: &MockEngine, options: SessionOptions) -> Session {
    Session::spawn(
        &engine::factory(mock.clone()),
        Box::new(SeedValidator),
        options,
    )
    .unwrap()
}

#[tokio::test]
async fn test_adult_birth_year_proves_and_verifies() {
    let factory = engine::factory(AgeCheckEngine::new(2025, 18));
    let mut session = age_session(&factory);
    session.wait_ready().await.unwrap();

    let id = session.submit_proof("1995").unwrap();
    let result = session.await_result().await.unwrap();
    assert_eq!(result.id, id);
    assert_eq!(result.metadata.engine, "age-check");
    assert_eq!(
        result.metadata.public_output.as_deref(),
        Some("age >= 18 in 2025")
    );

    assert_eq!(session.verify_last_proof(), Ok(true));
    assert_eq!(session.verify_last_proof(), Ok(true));

    let view = session.view();
    assert_eq!(view.lifecycle, Lifecycle::Ready);
    assert_eq!(view.verification, VerificationState::Passed);
    assert!(view.status.starts_with("Proof generated in "));
    assert_eq!(view.last_proof.unwrap().size, result.proof.len());

    session.shutdown();
}

#[tokio::test]
async fn test_underage_birth_year_is_rejected_locally() {
    let mock = MockEngine::new();
    let mut session = age_session(&engine::factory(mock.clone()));
    session.wait_ready().await.unwrap();

    let err = session.submit_proof("2015").unwrap_err();
    assert!(matches!(err, SessionError::InputValidation(_)));
    assert_eq!(err.to_string(), "Access Denied: You must be 18 or older.");

    let view = session.view();
    assert_eq!(view.lifecycle, Lifecycle::Ready);
    assert_eq!(
        view.rejection.as_deref(),
        Some("Access Denied: You must be 18 or older.")
    );
    assert!(view.last_proof.is_none());

    // Nothing ever reached the worker.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.prove_calls(), 0);

    let err = session.submit_proof("not a year").unwrap_err();
    assert_eq!(err.to_string(), "Please enter a valid birth year.");
}

#[tokio::test]
async fn test_duplicate_submission_is_request_in_flight() {
    let (mock, gate) = MockEngine::new().gated();
    let mut session = mock_session(&mock, SessionOptions::default());
    session.wait_ready().await.unwrap();

    let id = session.submit_proof("1").unwrap();
    assert_eq!(session.view().lifecycle, Lifecycle::Proving);
    assert!(!session.view().can_prove);

    assert_eq!(session.submit_proof("1"), Err(SessionError::RequestInFlight));
    assert_eq!(session.submit_proof("2"), Err(SessionError::RequestInFlight));

    gate.release();
    let result = session.await_result().await.unwrap();
    assert_eq!(result.id, id);
    assert_eq!(mock.prove_calls(), 1);
}

#[tokio::test]
async fn test_engine_fault_fails_session() {
    let mock = MockEngine::new().with_prove_fault("out of memory");
    let mut session = mock_session(&mock, SessionOptions::default());
    session.wait_ready().await.unwrap();

    session.submit_proof("1").unwrap();
    assert_eq!(
        session.await_result().await,
        Err(SessionError::EngineFault("out of memory".to_string()))
    );

    let view = session.view();
    assert_eq!(view.lifecycle, Lifecycle::Failed);
    assert_eq!(view.status, "Error: out of memory");
    assert!(view.last_proof.is_none());

    // No retry without an explicit reset.
    assert!(matches!(
        session.submit_proof("1"),
        Err(SessionError::SessionFailed(_))
    ));

    mock.clear_prove_fault();
    session.reset().unwrap();
    session.submit_proof("1").unwrap();
    assert!(session.await_result().await.is_ok());
    assert_eq!(mock.prove_calls(), 2);
}

#[tokio::test]
async fn test_engine_panic_is_a_fault() {
    let mock = MockEngine::new().with_prove_panic();
    let mut session = mock_session(&mock, SessionOptions::default());
    session.wait_ready().await.unwrap();

    session.submit_proof("1").unwrap();
    match session.await_result().await {
        Err(SessionError::EngineFault(message)) => assert!(message.contains("panicked")),
        other => panic!("expected engine fault, got {:?}", other),
    }

    // The worker survived and still answers.
    session.reset().unwrap();
    assert_eq!(session.view().lifecycle, Lifecycle::Ready);
}

#[tokio::test]
async fn test_timeout_abandons_and_drops_late_result() {
    let (mock, gate) = MockEngine::new().gated();
    let mut session = mock_session(
        &mock,
        SessionOptions {
            precompute: false,
            prove_timeout: Some(Duration::from_millis(250)),
        },
    );
    session.wait_ready().await.unwrap();

    let abandoned = session.submit_proof("1").unwrap();
    assert_eq!(
        session.await_result().await,
        Err(SessionError::TimedOut(Duration::from_millis(250)))
    );
    assert_eq!(session.view().lifecycle, Lifecycle::Failed);

    session.reset().unwrap();
    gate.release();

    let fresh = session.submit_proof("2").unwrap();
    let result = session.await_result().await.unwrap();
    assert_ne!(abandoned, fresh);
    assert_eq!(result.id, fresh);
    assert_eq!(mock.prove_calls(), 2);
}

#[tokio::test]
async fn test_shutdown_mid_flight() {
    let (mock, gate) = MockEngine::new().gated();
    let mut session = mock_session(&mock, SessionOptions::default());
    let views = session.watch();
    session.wait_ready().await.unwrap();

    session.submit_proof("1").unwrap();
    session.shutdown();

    let last = views.borrow().clone();
    assert_eq!(last.lifecycle, Lifecycle::Failed);
    assert_eq!(last.status, "Error: Channel closed");

    // The worker finishes on its own; its result goes nowhere.
    gate.release();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.prove_calls(), 1);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let factory = engine::factory(FibonacciEngine::new(8));
    let mut first = Session::spawn(&factory, Box::new(SeedValidator), SessionOptions::default())
        .unwrap();
    let mut second = Session::spawn(&factory, Box::new(SeedValidator), SessionOptions::default())
        .unwrap();

    first.wait_ready().await.unwrap();
    second.wait_ready().await.unwrap();

    let a = first.submit_proof("3").unwrap();
    let b = second.submit_proof("4").unwrap();
    let (ra, rb) = tokio::join!(first.await_result(), second.await_result());
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.id, a);
    assert_eq!(rb.id, b);
    assert_ne!(ra.metadata.public_output, rb.metadata.public_output);

    assert_eq!(first.verify_last_proof(), Ok(true));
    assert_eq!(second.verify_last_proof(), Ok(true));

    first.shutdown();
    // The second session does not notice.
    assert_eq!(second.view().lifecycle, Lifecycle::Ready);
}

#[tokio::test]
async fn test_square_argument_proves_and_verifies() {
    let image = GuestImage::new(square::BUILTIN_GUEST.to_vec());
    let mut session = Session::spawn(
        &engine::factory(SquareEngine::new(image.clone())),
        Box::new(SquareValidator::new(image)),
        SessionOptions::default(),
    )
    .unwrap();
    session.wait_ready().await.unwrap();

    let err = session.submit_proof("70000").unwrap_err();
    assert!(matches!(err, SessionError::InputValidation(_)));

    session.submit_proof("12").unwrap();
    let result = session.await_result().await.unwrap();
    assert_eq!(result.metadata.engine, "guest-square");
    assert_eq!(result.metadata.public_output.as_deref(), Some("144"));
    assert_eq!(session.verify_last_proof(), Ok(true));

    session.shutdown();
}

#[tokio::test]
async fn test_compiled_program_proves_and_verifies() {
    let mut session = Session::spawn(
        &engine::factory(CairoMockEngine::new()),
        Box::new(JsonProgramValidator::default()),
        SessionOptions::default(),
    )
    .unwrap();
    session.wait_ready().await.unwrap();

    let err = session.submit_proof(r#"{"prime": "0x1"}"#).unwrap_err();
    assert!(err.to_string().starts_with("Invalid program: "));
    assert!(session.view().last_proof.is_none());

    session
        .submit_proof(r#"{"data": ["0x40780017fff7fff", "0x1", "0x208b7fff7fff7ffe"]}"#)
        .unwrap();
    let result = session.await_result().await.unwrap();
    assert_eq!(result.metadata.public_output.as_deref(), Some("trace length 3"));
    assert_eq!(session.verify_last_proof(), Ok(true));
    assert_eq!(session.view().verification, VerificationState::Passed);

    session.shutdown();
}
