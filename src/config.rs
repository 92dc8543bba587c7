//! Prover configuration file handling
//!
//! Configuration files are TOML. Every section is optional and falls back to
//! the defaults the sample applications ship with, so an empty file is a
//! valid configuration.

use crate::engine::{
    self,
    age_check::{self, AgeCheckEngine},
    fibonacci::{self, FibonacciEngine},
    square::{self, SquareEngine},
    CairoMockEngine, EngineFactory, GuestImage,
};
use crate::session::{
    BirthYearValidator, InputValidator, JsonProgramValidator, SeedValidator, SessionOptions,
    SquareValidator, DEFAULT_EARLIEST_YEAR, DEFAULT_MAX_PROGRAM_BYTES,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file '{0}' already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which sample workload a session proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Workload {
    /// Squared Fibonacci from a private seed
    Fibonacci,
    /// Minimum age from a private birth year
    AgeCheck,
    /// Square of a private argument inside a guest image
    Square,
    /// Compiled Cairo program (JSON), mock prover
    Cairo,
}

/// Local prover configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProverConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub fibonacci: FibonacciConfig,

    #[serde(default)]
    pub age_check: AgeCheckConfig,

    #[serde(default)]
    pub square: SquareConfig,

    #[serde(default)]
    pub cairo: CairoConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Workload proved when the command line does not pick one
    #[serde(default = "default_workload")]
    pub workload: Workload,

    /// Run the engine warm-up after initialization
    #[serde(default = "default_precompute")]
    pub precompute: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciConfig {
    /// Trace length (power of two, at least 8)
    #[serde(default = "default_trace_length")]
    pub trace_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeCheckConfig {
    #[serde(default = "default_reference_year")]
    pub reference_year: u32,

    #[serde(default = "default_minimum_age")]
    pub minimum_age: u32,

    /// Earliest birth year accepted as input
    #[serde(default = "default_earliest_year")]
    pub earliest_year: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SquareConfig {
    /// Guest image file; the built-in square guest when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CairoConfig {
    /// Largest program accepted as input, in bytes
    #[serde(default = "default_max_program_bytes")]
    pub max_program_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Abandon proofs that take longer than this (e.g. "90s"); unset waits forever
    #[serde(default, with = "humantime_option")]
    pub prove_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_workload() -> Workload {
    Workload::Fibonacci
}

fn default_precompute() -> bool {
    true
}

fn default_trace_length() -> usize {
    fibonacci::DEFAULT_TRACE_LENGTH
}

fn default_reference_year() -> u32 {
    age_check::DEFAULT_REFERENCE_YEAR
}

fn default_minimum_age() -> u32 {
    age_check::DEFAULT_MINIMUM_AGE
}

fn default_earliest_year() -> u32 {
    DEFAULT_EARLIEST_YEAR
}

fn default_max_program_bytes() -> usize {
    DEFAULT_MAX_PROGRAM_BYTES
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workload: default_workload(),
            precompute: default_precompute(),
        }
    }
}

impl Default for FibonacciConfig {
    fn default() -> Self {
        Self {
            trace_length: default_trace_length(),
        }
    }
}

impl Default for AgeCheckConfig {
    fn default() -> Self {
        Self {
            reference_year: default_reference_year(),
            minimum_age: default_minimum_age(),
            earliest_year: default_earliest_year(),
        }
    }
}

impl Default for CairoConfig {
    fn default() -> Self {
        Self {
            max_program_bytes: default_max_program_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `Option<Duration>` as a humantime string ("90s", "2m 30s").
mod humantime_option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                serializer.serialize_str(&humantime::format_duration(*duration).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl ProverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: ProverConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        write_file(path, &contents)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let trace_length = self.fibonacci.trace_length;
        if !trace_length.is_power_of_two() || trace_length < fibonacci::MIN_TRACE_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "fibonacci.trace_length must be a power of two >= {}, got {}",
                fibonacci::MIN_TRACE_LENGTH,
                trace_length
            )));
        }

        let age = &self.age_check;
        if age.minimum_age >= age.reference_year {
            return Err(ConfigError::Invalid(
                "age_check.minimum_age must be below age_check.reference_year".to_string(),
            ));
        }
        if age.earliest_year > age.reference_year - age.minimum_age {
            return Err(ConfigError::Invalid(
                "age_check.earliest_year leaves no acceptable birth year".to_string(),
            ));
        }
        if age.reference_year - age.minimum_age - age.earliest_year > age_check::MAX_SLACK {
            return Err(ConfigError::Invalid(format!(
                "age_check.earliest_year must be within {} years of the latest acceptable year",
                age_check::MAX_SLACK
            )));
        }

        if self.cairo.max_program_bytes == 0 {
            return Err(ConfigError::Invalid(
                "cairo.max_program_bytes must be positive".to_string(),
            ));
        }

        if self.session.prove_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "session.prove_timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// The guest image of the square workload, read from `square.guest`
    /// when set.
    pub fn guest_image(&self) -> Result<GuestImage, ConfigError> {
        match &self.square.guest {
            Some(path) => {
                let bytes = fs::read(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                if bytes.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "guest image '{}' is empty",
                        path.display()
                    )));
                }
                Ok(GuestImage::new(bytes))
            }
            None => Ok(GuestImage::new(square::BUILTIN_GUEST.to_vec())),
        }
    }

    /// Factory producing fresh engines for `workload`.
    pub fn engine_factory(&self, workload: Workload) -> Result<EngineFactory, ConfigError> {
        let factory = match workload {
            Workload::Fibonacci => {
                engine::factory(FibonacciEngine::new(self.fibonacci.trace_length))
            }
            Workload::AgeCheck => engine::factory(AgeCheckEngine::new(
                self.age_check.reference_year,
                self.age_check.minimum_age,
            )),
            Workload::Square => engine::factory(SquareEngine::new(self.guest_image()?)),
            Workload::Cairo => engine::factory(CairoMockEngine::new()),
        };
        Ok(factory)
    }

    /// Input validator matching `workload`.
    pub fn validator(&self, workload: Workload) -> Result<Box<dyn InputValidator>, ConfigError> {
        let validator: Box<dyn InputValidator> = match workload {
            Workload::Fibonacci => Box::new(SeedValidator),
            Workload::AgeCheck => Box::new(BirthYearValidator::new(
                self.age_check.earliest_year,
                self.age_check.reference_year,
                self.age_check.minimum_age,
            )),
            Workload::Square => Box::new(SquareValidator::new(self.guest_image()?)),
            Workload::Cairo => Box::new(JsonProgramValidator::new(self.cairo.max_program_bytes)),
        };
        Ok(validator)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            precompute: self.engine.precompute,
            prove_timeout: self.session.prove_timeout,
        }
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        format!(
            r#"# Local Prover Configuration
#
# Every section is optional; missing values use the defaults shown here.

[engine]
# Workload proved when --workload is not given:
# "fibonacci", "age-check", "square" or "cairo"
workload = "fibonacci"

# Run the engine warm-up (a self-test proof) right after initialization
precompute = true

[fibonacci]
# Trace length: a power of two, at least {min_trace}
trace_length = {trace_length}

[age_check]
# Proves age >= minimum_age in reference_year without revealing the birth year
reference_year = {reference_year}
minimum_age = {minimum_age}

# Earliest birth year accepted as input
earliest_year = {earliest_year}

[square]
# Guest image file. Leave commented to run the built-in square guest.
# guest = "/path/to/guest.bin"

[cairo]
# Largest compiled program accepted as input, in bytes
max_program_bytes = {max_program_bytes}

[session]
# Give up on a proof that takes longer than this (e.g. "90s", "5m").
# Leave commented to wait as long as the engine needs.
# prove_timeout = "5m"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "{level}"
"#,
            min_trace = fibonacci::MIN_TRACE_LENGTH,
            trace_length = fibonacci::DEFAULT_TRACE_LENGTH,
            reference_year = age_check::DEFAULT_REFERENCE_YEAR,
            minimum_age = age_check::DEFAULT_MINIMUM_AGE,
            earliest_year = DEFAULT_EARLIEST_YEAR,
            max_program_bytes = DEFAULT_MAX_PROGRAM_BYTES,
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Write the commented default file, refusing to clobber unless `force`.
    pub fn create_default(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        write_file(path, &Self::generate_default_toml())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, contents).map_err(write_err)
}

/// Get the default config file path
///
/// - Linux: ~/.local/share/local-prover/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("local-prover")
        .join("config.toml")
}
