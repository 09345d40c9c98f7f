//! Burst BCI Accumulation - online evidence accumulation and decision engine
//!
//! Fuses a per-frame stream of classifier probabilities into discrete
//! target decisions. Samples enter a bounded circular buffer, the buffer
//! trace is correlated against every reference code, and a pluggable
//! stopping-rule policy decides when enough evidence accumulated.
//!
//! # Modules
//!
//! - [`policy`]: The [`DecisionPolicy`](policy::DecisionPolicy) trait, the
//!   simple stopping rules (prevalent-target vote, steady streak,
//!   momentum), and the policy registry
//! - [`pomdp`]: The POMDP policy: confusion-matrix calibration, problem
//!   construction, SARSOP solver bridge, and the online belief loop
//! - [`engine`]: The [`AccumulationEngine`](engine::AccumulationEngine)
//!   orchestrator, the only type the surrounding runtime talks to
//! - [`error`]: Error types for policies and the solver bridge

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod policy;
pub mod pomdp;

pub use engine::AccumulationEngine;
pub use error::{AccumulationError, AccumulationResult, SolverError};
pub use policy::{Decision, DecisionPolicy, FrameView, PolicySpec};
