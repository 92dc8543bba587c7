use local_prover::config::default_config_path;
use local_prover::ProverConfig;
use std::path::PathBuf;

/// Write a commented default configuration file
pub fn init(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.unwrap_or_else(default_config_path);
    ProverConfig::create_default(&path, force)?;
    println!("✅ Wrote default configuration to {}", path.display());
    Ok(())
}
