use clap::{Parser, Subcommand};
use local_prover::Workload;
use std::path::PathBuf;

pub mod config;
pub mod proof_file;
pub mod prove;
pub mod verify;
pub mod version;

#[derive(Parser)]
#[command(name = "local-prover")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate and verify STARK proofs on this machine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a proof on a background worker
    Prove {
        /// Raw input: a seed for fibonacci, a birth year for age-check,
        /// the argument for square
        #[arg(long, required_unless_present = "input_file")]
        input: Option<String>,

        /// Read the input from a file (a compiled program for cairo)
        #[arg(long, conflicts_with = "input")]
        input_file: Option<PathBuf>,

        /// Workload to prove (default: from config)
        #[arg(long, value_enum)]
        workload: Option<Workload>,

        /// Path to config file (default: ~/.local/share/local-prover/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Verify the proof locally once it is generated
        #[arg(long)]
        verify: bool,

        /// Write the proof to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify a proof file
    Verify {
        /// Proof file written by `prove --output`
        #[arg(long)]
        proof: PathBuf,

        /// Workload the proof belongs to (default: from the proof file)
        #[arg(long, value_enum)]
        workload: Option<Workload>,

        /// Path to config file (default: ~/.local/share/local-prover/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Where to write it (default: ~/.local/share/local-prover/config.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Prove {
            input,
            input_file,
            workload,
            config,
            verify,
            output,
        } => {
            let source = match input_file {
                Some(path) => prove::InputSource::File(path),
                None => prove::InputSource::Text(input.unwrap_or_default()),
            };
            prove::execute(source, workload, config, verify, output).await
        }
        Commands::Verify {
            proof,
            workload,
            config,
        } => verify::execute(proof, workload, config).await,
        Commands::Config {
            action: ConfigAction::Init { path, force },
        } => config::init(path, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_prove() {
        let cli = Cli::parse_from(["local-prover", "prove", "--input", "12345"]);

        match cli.command {
            Commands::Prove {
                input,
                input_file,
                workload,
                config,
                verify,
                output,
            } => {
                assert_eq!(input.as_deref(), Some("12345"));
                assert_eq!(input_file, None);
                assert_eq!(workload, None);
                assert_eq!(config, None);
                assert!(!verify);
                assert_eq!(output, None);
            }
            _ => panic!("Expected Prove command"),
        }
    }

    #[test]
    fn test_cli_parse_prove_with_options() {
        let cli = Cli::parse_from([
            "local-prover",
            "prove",
            "--input",
            "1995",
            "--workload",
            "age-check",
            "--verify",
            "--output",
            "/tmp/proof.json",
        ]);

        match cli.command {
            Commands::Prove {
                workload,
                verify,
                output,
                ..
            } => {
                assert_eq!(workload, Some(Workload::AgeCheck));
                assert!(verify);
                assert_eq!(output, Some(PathBuf::from("/tmp/proof.json")));
            }
            _ => panic!("Expected Prove command"),
        }
    }

    #[test]
    fn test_cli_parse_prove_from_file() {
        let cli = Cli::parse_from([
            "local-prover",
            "prove",
            "--input-file",
            "program.json",
            "--workload",
            "cairo",
        ]);

        match cli.command {
            Commands::Prove {
                input,
                input_file,
                workload,
                ..
            } => {
                assert_eq!(input, None);
                assert_eq!(input_file, Some(PathBuf::from("program.json")));
                assert_eq!(workload, Some(Workload::Cairo));
            }
            _ => panic!("Expected Prove command"),
        }
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::parse_from(["local-prover", "verify", "--proof", "proof.json"]);

        match cli.command {
            Commands::Verify {
                proof, workload, ..
            } => {
                assert_eq!(proof, PathBuf::from("proof.json"));
                assert_eq!(workload, None);
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::parse_from(["local-prover", "config", "init", "--force"]);

        match cli.command {
            Commands::Config {
                action: ConfigAction::Init { path, force },
            } => {
                assert_eq!(path, None);
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::parse_from(["local-prover", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["local-prover", "prove"]).is_err());
        assert!(Cli::try_parse_from([
            "local-prover",
            "prove",
            "--input",
            "1",
            "--workload",
            "sudoku",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_input_and_input_file_conflict() {
        assert!(Cli::try_parse_from([
            "local-prover",
            "prove",
            "--input",
            "1",
            "--input-file",
            "program.json",
        ])
        .is_err());
    }
}
