use super::proof_file::ProofFile;
use local_prover::{logging, EngineBinding, ProverConfig, Workload};
use std::path::PathBuf;

/// Verify a proof file locally
///
/// Runs on the calling thread: verification is cheap compared to proving and
/// never needs a worker.
pub async fn execute(
    proof: PathBuf,
    workload: Option<Workload>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProverConfig::load_or_default(config.as_deref())?;
    logging::init(&config.logging.level);

    let file = ProofFile::load(&proof)?;
    let workload = workload.unwrap_or(file.workload);

    println!("🔍 Verifying {} ({} bytes)", proof.display(), file.proof.len());
    println!("  Engine: {}", file.metadata.engine);
    println!("  Fingerprint: {}", file.proof.fingerprint());
    if let Some(output) = &file.metadata.public_output {
        println!("  Public output: {}", output);
    }
    println!();

    let mut binding = EngineBinding::new(config.engine_factory(workload)?());
    binding.initialize()?;

    if binding.verify(&file.proof)? {
        println!("✅ VERIFICATION PASSED");
        Ok(())
    } else {
        println!("❌ VERIFICATION FAILED");
        Err("Verification failed".into())
    }
}
