//! Burst BCI Core - types and pure computation for burst c-VEP decoding
//!
//! This crate provides the foundational pieces of the burst-code evidence
//! accumulation pipeline: per-target reference codes, the bounded evidence
//! buffer, the correlation scorer, stream records, and validated
//! configuration types.
//!
//! # Modules
//!
//! - [`types`]: Target identifiers, reference codes, and the codebook
//! - [`buffer`]: Bounded FIFO buffer of per-frame evidence samples
//! - [`correlation`]: Pearson correlation scoring against the codebook
//! - [`records`]: Stream input records and engine output records
//! - [`config`]: Configuration structs with range validation
//! - [`error`]: Error types for configuration, codes, and scoring

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod config;
pub mod correlation;
pub mod error;
pub mod records;
pub mod types;

pub use buffer::{EvidenceBuffer, EvidenceSample};
pub use config::{AccumulationConfig, MomentumConfig, PomdpConfig, SteadyConfig};
pub use correlation::{CorrelationScorer, TargetScore};
pub use error::{CodeError, CodeResult, ConfigError, ConfigResult};
pub use records::{EngineOutput, Prediction, StreamRecord};
pub use types::{Code, CodeBook, TargetId};
