//! Error types for codes and configuration using `thiserror`.

use thiserror::Error;

/// Errors raised while building reference codes and codebooks.
#[derive(Error, Debug)]
pub enum CodeError {
    /// A codebook must hold at least one code
    #[error("Codebook is empty: at least one target code is required")]
    EmptyCodebook,

    /// A reference code must hold at least one bit
    #[error("Reference code for target {target} is empty")]
    EmptyCode {
        /// Index of the offending code
        target: usize,
    },

    /// All codes in a book share the same cycle length
    #[error("Code length mismatch for target {target}: got {got} bits, expected {expected}")]
    LengthMismatch {
        /// Index of the offending code
        target: usize,
        /// Length of the offending code
        got: usize,
        /// Length established by the first code
        expected: usize,
    },

    /// Codes are strictly binary
    #[error("Invalid bit {value:?} at position {position} in reference code")]
    InvalidBit {
        /// Position of the offending symbol
        position: usize,
        /// The offending symbol
        value: char,
    },
}

/// Errors raised by configuration validation.
///
/// The core never silently clamps or defaults an out-of-range value:
/// construction fails with the parameter name and the violated constraint.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A numeric parameter is outside its documented range
    #[error("Invalid value {value} for `{parameter}`: must satisfy {constraint}")]
    OutOfRange {
        /// Parameter name
        parameter: &'static str,
        /// The rejected value
        value: f64,
        /// Human-readable constraint, e.g. "0 < norm_value < 1"
        constraint: &'static str,
    },

    /// Two parameters are mutually inconsistent
    #[error("Inconsistent parameters: {reason}")]
    Inconsistent {
        /// What is inconsistent
        reason: &'static str,
    },

    /// A required path is missing or empty
    #[error("Missing required path for `{parameter}`")]
    MissingPath {
        /// Parameter name
        parameter: &'static str,
    },
}

/// Result type for code construction.
pub type CodeResult<T> = Result<T, CodeError>;

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
