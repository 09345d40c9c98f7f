//! Error types for policies, the engine, and the solver bridge.

use thiserror::Error;

use burst_bci_core::error::{CodeError, ConfigError};

/// Failures of the external SARSOP solver invocation.
///
/// Any of these leaves the POMDP policy usably stuck in its solving state:
/// the engine keeps running, but belief-driven decisions never start until
/// a later solve succeeds.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The solver executable could not be launched
    #[error("Failed to launch solver at {path}: {source}")]
    Launch {
        /// Configured solver path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The solver exited with a failure status (non-convergence, timeout)
    #[error("Solver exited with {status}: {stderr}")]
    Failed {
        /// Process exit status
        status: std::process::ExitStatus,
        /// Captured standard error
        stderr: String,
    },

    /// The solver reported success but produced no policy file
    #[error("Solver produced no policy file at {path}")]
    PolicyMissing {
        /// Expected policy file path
        path: String,
    },

    /// The policy file could not be parsed
    #[error("Malformed policy file: {reason}")]
    PolicyParse {
        /// What was wrong
        reason: String,
    },

    /// Writing the serialized problem failed
    #[error("Failed to write POMDP problem file: {0}")]
    ProblemWrite(#[from] std::io::Error),
}

/// Errors surfaced by the accumulation engine and its policies.
#[derive(Error, Debug)]
pub enum AccumulationError {
    /// A configuration struct failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Codebook construction failed
    #[error(transparent)]
    Code(#[from] CodeError),

    /// The external POMDP solver failed
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// Calibration ended without any (predicted, true) pairs
    #[error("POMDP calibration collected no prediction/cue pairs")]
    EmptyCalibration,

    /// The belief update underflowed to an all-zero distribution
    #[error("Belief update underflowed for observation {observation}")]
    BeliefUnderflow {
        /// The observation that zeroed the belief
        observation: usize,
    },
}

/// Result type for engine and policy operations.
pub type AccumulationResult<T> = Result<T, AccumulationError>;
