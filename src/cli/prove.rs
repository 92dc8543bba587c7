use super::proof_file::ProofFile;
use futures::StreamExt;
use local_prover::session::SessionError;
use local_prover::{logging, render_view, ProverConfig, Session, SessionView, Workload};
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use tokio_stream::wrappers::WatchStream;

/// Where the raw prove input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Text(String),
    File(PathBuf),
}

impl InputSource {
    fn read(self) -> Result<String, std::io::Error> {
        match self {
            InputSource::Text(text) => Ok(text),
            InputSource::File(path) => fs::read_to_string(path),
        }
    }
}

/// Generate a proof for `input` on a background worker
///
/// Prints status changes while the worker runs, then the proof summary.
pub async fn execute(
    input: InputSource,
    workload: Option<Workload>,
    config: Option<PathBuf>,
    verify: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProverConfig::load_or_default(config.as_deref())?;
    logging::init(&config.logging.level);

    let input = input.read()?;
    let workload = workload.unwrap_or(config.engine.workload);
    let factory = config.engine_factory(workload)?;
    let mut session = Session::spawn(
        &factory,
        config.validator(workload)?,
        config.session_options(),
    )?;

    let mut views = session.subscribe();
    let mut last_status = String::new();

    with_status(session.wait_ready(), &mut views, &mut last_status).await?;

    if let Err(e) = session.submit_proof(&input) {
        if let SessionError::InputValidation(reason) = &e {
            println!("❌ {}", reason);
        }
        session.shutdown();
        return Err(e.into());
    }

    let result = with_status(session.await_result(), &mut views, &mut last_status).await?;

    if verify {
        // A failed verification is reported in the view, not as an error.
        if let Err(e) = session.verify_last_proof() {
            tracing::warn!(error = %e, "verification errored");
        }
    }

    println!();
    println!("{}", render_view(&session.view()));

    if let Some(path) = output {
        ProofFile {
            workload,
            proof: result.proof,
            metadata: result.metadata,
        }
        .save(&path)?;
        println!();
        println!("💾 Proof written to {}", path.display());
    }

    session.shutdown();
    Ok(())
}

/// Await `fut`, printing every new status text published meanwhile.
async fn with_status<T>(
    fut: impl Future<Output = Result<T, SessionError>>,
    views: &mut WatchStream<SessionView>,
    last_status: &mut String,
) -> Result<T, SessionError> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            result = &mut fut => return result,
            Some(view) = views.next() => {
                if view.status != *last_status {
                    println!("⏳ {}", view.status);
                    *last_status = view.status;
                }
            }
        }
    }
}
