use local_prover::engine::{age_check, cairo, fibonacci, square};

/// Display version information
pub fn execute() {
    println!("local-prover {}", env!("CARGO_PKG_VERSION"));
    println!("On-device STARK proving with a background worker");
    println!();
    println!("Engines:");
    println!("  {} (winterfell)", fibonacci::ENGINE_NAME);
    println!("  {} (winterfell)", age_check::ENGINE_NAME);
    println!("  {} (winterfell)", square::ENGINE_NAME);
    println!("  {} (commitment only)", cairo::ENGINE_NAME);
}
