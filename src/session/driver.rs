//! Async session driver.
//!
//! Owns the state machine, the foreground end of the worker channel and a
//! local binding used only for verification. Every change is published as a
//! [`SessionView`] on a watch channel.

use super::{
    machine::{SessionMachine, Transition},
    state::{FailureKind, SessionState},
    validation::InputValidator,
    SessionError,
};
use crate::engine::{EngineBinding, EngineFactory};
use crate::view::SessionView;
use crate::worker::{Envelope, ProveResult, RequestId, WorkerChannel};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Knobs for a new session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Run the engine's warm-up right after initialization.
    pub precompute: bool,

    /// Abandon a proof request that takes longer than this.
    pub prove_timeout: Option<Duration>,
}

pub struct Session {
    machine: SessionMachine,
    channel: WorkerChannel,
    verifier: EngineBinding,
    views: watch::Sender<SessionView>,
    prove_timeout: Option<Duration>,
    deadline: Option<Deadline>,
}

/// When the pending request is abandoned.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Session {
    /// Start a worker for a fresh engine and send it `Init`.
    pub fn spawn(
        factory: &EngineFactory,
        validator: Box<dyn InputValidator>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let channel = WorkerChannel::spawn(factory(), options.precompute)?;
        let verifier = EngineBinding::new(factory());
        let machine = SessionMachine::new(validator);
        let (views, _) = watch::channel(machine.view());

        let mut session = Self {
            machine,
            channel,
            verifier,
            views,
            prove_timeout: options.prove_timeout,
            deadline: None,
        };

        if let Some(init) = session.machine.start()? {
            session.dispatch(&init)?;
        }
        session.publish();
        info!(engine = session.channel.engine_name(), "session started");
        Ok(session)
    }

    /// Wait until the worker has acknowledged initialization.
    pub async fn wait_ready(&mut self) -> Result<(), SessionError> {
        loop {
            match self.machine.state() {
                SessionState::Initializing => {
                    self.next_event().await?;
                }
                SessionState::Uninitialized => return Err(SessionError::NotInitialized),
                SessionState::Failed { message, kind } => {
                    return Err(failure_error(message, *kind))
                }
                SessionState::Ready | SessionState::Proving { .. } => return Ok(()),
            }
        }
    }

    /// Validate `raw` and dispatch a proof request for it.
    ///
    /// Returns once the request is on the channel, not when it completes.
    pub fn submit_proof(&mut self, raw: &str) -> Result<RequestId, SessionError> {
        let request = match self.machine.submit(raw) {
            Ok(request) => request,
            Err(e) => {
                // Rejections are part of the view.
                self.publish();
                return Err(e);
            }
        };

        let id = request.id;
        self.deadline = self.prove_timeout.map(|timeout| Deadline {
            at: Instant::now() + timeout,
            timeout,
        });
        self.dispatch(&Envelope::Prove(request))?;
        self.publish();
        info!(request_id = %id, "proof requested");
        Ok(id)
    }

    /// Receive and apply the next envelope from the worker.
    ///
    /// While a request is pending past its deadline, the request is abandoned
    /// instead and `TimedOut` is returned.
    pub async fn next_event(&mut self) -> Result<Transition, SessionError> {
        let pending = self.machine.pending_request_id();
        let received = match (self.deadline, pending) {
            (Some(deadline), Some(id)) => {
                match time::timeout_at(deadline.at, self.channel.recv()).await {
                    Ok(received) => received,
                    Err(_) => return Err(self.time_out(id, deadline.timeout)),
                }
            }
            _ => self.channel.recv().await,
        };

        let Some(envelope) = received else {
            self.machine.channel_closed();
            self.deadline = None;
            self.publish();
            return Err(SessionError::ChannelClosed);
        };

        let kind = envelope.kind();
        let transition = self.machine.handle(envelope);
        if let Transition::Ignored(reason) = transition {
            debug!(kind, reason, "envelope ignored");
        }
        if self.machine.pending_request_id().is_none() {
            self.deadline = None;
        }
        self.publish();
        Ok(transition)
    }

    /// Drive the channel until the pending request resolves.
    pub async fn await_result(&mut self) -> Result<ProveResult, SessionError> {
        let id = self
            .machine
            .pending_request_id()
            .ok_or(SessionError::NoResult)?;

        loop {
            self.next_event().await?;

            match self.machine.state() {
                SessionState::Proving { request_id } if *request_id == id => continue,
                SessionState::Ready => {
                    return self
                        .machine
                        .last_result()
                        .filter(|result| result.id == id)
                        .cloned()
                        .ok_or(SessionError::NoResult);
                }
                SessionState::Failed { message, kind } => {
                    return Err(failure_error(message, *kind))
                }
                _ => return Err(SessionError::NoResult),
            }
        }
    }

    /// Verify the last proof with the foreground binding.
    ///
    /// Never touches the worker and never changes the proving lifecycle.
    pub fn verify_last_proof(&mut self) -> Result<bool, SessionError> {
        let proof = self.machine.begin_verification()?;
        self.publish();

        let outcome = self
            .verifier
            .initialize()
            .and_then(|()| self.verifier.verify(&proof));
        self.machine.finish_verification(&outcome);
        self.publish();

        match &outcome {
            Ok(valid) => info!(valid, fingerprint = %proof.fingerprint(), "proof verified"),
            Err(e) => warn!(error = %e, "verification errored"),
        }
        outcome.map_err(SessionError::from)
    }

    /// Leave `Failed`, re-sending `Init` if the worker never came up.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.machine.reset()?;
        self.deadline = None;
        if let Some(init) = self.machine.start()? {
            self.dispatch(&init)?;
        }
        self.publish();
        info!("session reset");
        Ok(())
    }

    /// Current view.
    pub fn view(&self) -> SessionView {
        self.views.borrow().clone()
    }

    /// Receiver that observes every published view.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.views.subscribe()
    }

    /// Views as a stream, starting with the current one.
    pub fn subscribe(&self) -> WatchStream<SessionView> {
        WatchStream::new(self.views.subscribe())
    }

    /// Tear the session down without waiting for in-flight work.
    pub fn shutdown(mut self) {
        self.channel.close();
        self.machine.channel_closed();
        self.publish();
        info!("session shut down");
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<(), SessionError> {
        if let Err(e) = self.channel.send(envelope) {
            warn!(error = %e, kind = envelope.kind(), "dispatch failed");
            self.machine.channel_closed();
            self.publish();
            return Err(e.into());
        }
        Ok(())
    }

    fn time_out(&mut self, id: RequestId, timeout: Duration) -> SessionError {
        let err = SessionError::TimedOut(timeout);
        warn!(request_id = %id, "prove timed out, abandoning request");
        self.machine.abandon(id, err.to_string());
        self.deadline = None;
        self.publish();
        err
    }

    fn publish(&self) {
        self.views.send_replace(self.machine.view());
    }
}

fn failure_error(message: &str, kind: FailureKind) -> SessionError {
    match kind {
        FailureKind::ChannelClosed => SessionError::ChannelClosed,
        FailureKind::Timeout => SessionError::SessionFailed(message.to_string()),
        FailureKind::Initialization | FailureKind::Engine => {
            SessionError::EngineFault(message.to_string())
        }
    }
}
