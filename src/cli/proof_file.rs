//! On-disk proof file written by `prove --output` and read by `verify`.

use local_prover::engine::{ProofBytes, ProofMetadata};
use local_prover::Workload;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofFile {
    pub workload: Workload,
    pub proof: ProofBytes,
    pub metadata: ProofMetadata,
}

impl ProofFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read proof file '{}': {}", path.display(), e))?;
        let file = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse proof file '{}': {}", path.display(), e))?;
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .map_err(|e| format!("Failed to write proof file '{}': {}", path.display(), e))?;
        Ok(())
    }
}
