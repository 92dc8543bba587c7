//! Foreground input validation.
//!
//! Runs before anything is dispatched: the worker never sees input a
//! validator rejected.

use crate::engine::{cairo::CompiledProgram, traits::GuestImage, ProveInput};

pub const DEFAULT_EARLIEST_YEAR: u32 = 1875;
pub const DEFAULT_MAX_PROGRAM_BYTES: usize = 4 * 1024 * 1024;

/// Input validation errors. The display text is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid seed (a non-negative integer).")]
    InvalidSeed,

    #[error("Please enter a valid birth year.")]
    InvalidBirthYear,

    #[error("Access Denied: You must be {minimum_age} or older.")]
    Underage { minimum_age: u32 },

    #[error("Please enter a valid argument (a non-negative integer).")]
    InvalidArgument,

    #[error("Overflow: the square of {argument} does not fit in 32 bits.")]
    ArgumentOverflow { argument: u32 },

    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Program is too large ({size} bytes, limit {max_bytes}).")]
    ProgramTooLarge { size: usize, max_bytes: usize },
}

/// Turns raw user text into an engine input.
pub trait InputValidator: Send {
    fn validate(&self, raw: &str) -> Result<ProveInput, ValidationError>;
}

/// Accepts any 32-bit unsigned integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedValidator;

impl InputValidator for SeedValidator {
    fn validate(&self, raw: &str) -> Result<ProveInput, ValidationError> {
        raw.trim()
            .parse::<u32>()
            .map(ProveInput::Seed)
            .map_err(|_| ValidationError::InvalidSeed)
    }
}

/// Accepts a birth year old enough at the reference year.
#[derive(Debug, Clone, Copy)]
pub struct BirthYearValidator {
    pub earliest_year: u32,
    pub reference_year: u32,
    pub minimum_age: u32,
}

impl BirthYearValidator {
    pub fn new(earliest_year: u32, reference_year: u32, minimum_age: u32) -> Self {
        Self {
            earliest_year,
            reference_year,
            minimum_age,
        }
    }
}

impl InputValidator for BirthYearValidator {
    fn validate(&self, raw: &str) -> Result<ProveInput, ValidationError> {
        let year: u32 = raw
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidBirthYear)?;

        if year < self.earliest_year || year > self.reference_year {
            return Err(ValidationError::InvalidBirthYear);
        }

        if self.reference_year - year < self.minimum_age {
            return Err(ValidationError::Underage {
                minimum_age: self.minimum_age,
            });
        }

        Ok(ProveInput::BirthYear(year))
    }
}

/// Accepts a guest argument whose square fits the guest's `u32`.
#[derive(Debug, Clone)]
pub struct SquareValidator {
    pub image: GuestImage,
}

impl SquareValidator {
    pub fn new(image: GuestImage) -> Self {
        Self { image }
    }
}

impl InputValidator for SquareValidator {
    fn validate(&self, raw: &str) -> Result<ProveInput, ValidationError> {
        let argument: u32 = raw
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidArgument)?;

        if argument.checked_mul(argument).is_none() {
            return Err(ValidationError::ArgumentOverflow { argument });
        }

        Ok(ProveInput::Guest {
            image: self.image.clone(),
            argument,
        })
    }
}

/// Accepts compiled-program JSON up to a size limit.
#[derive(Debug, Clone, Copy)]
pub struct JsonProgramValidator {
    pub max_bytes: usize,
}

impl JsonProgramValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for JsonProgramValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROGRAM_BYTES)
    }
}

impl InputValidator for JsonProgramValidator {
    fn validate(&self, raw: &str) -> Result<ProveInput, ValidationError> {
        if raw.len() > self.max_bytes {
            return Err(ValidationError::ProgramTooLarge {
                size: raw.len(),
                max_bytes: self.max_bytes,
            });
        }

        CompiledProgram::parse(raw).map_err(ValidationError::InvalidProgram)?;
        Ok(ProveInput::JsonProgram(raw.to_string()))
    }
}
