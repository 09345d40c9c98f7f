//! Stopping-rule policies and the policy registry.
//!
//! A policy consumes the per-target correlation scores once per accepted
//! frame and decides whether enough evidence accumulated. Policies share
//! the scorer and buffer through [`FrameView`] by composition; there is no
//! inheritance chain, only the [`DecisionPolicy`] trait and four concrete
//! variants (plus the POMDP policy in [`crate::pomdp`]).

mod momentum;
mod prevalent;
mod random;
mod steady;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use burst_bci_core::{
    AccumulationConfig, CodeBook, EvidenceBuffer, MomentumConfig, PomdpConfig, SteadyConfig,
    TargetId, TargetScore,
};

use crate::error::AccumulationResult;
use crate::pomdp::PomdpPolicy;
use burst_bci_core::records::{EngineOutput, StreamRecord};

pub use momentum::MomentumPolicy;
pub use prevalent::PrevalentTargetPolicy;
pub use random::RandomPolicy;
pub use steady::SteadyPredPolicy;

/// What a policy wants after seeing one frame of scores.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Keep accumulating
    Continue,
    /// Emit a target decision and end the episode
    Predict {
        /// The decided target
        target: TargetId,
        /// Policy-specific decision score
        score: f64,
        /// Whether the frame budget forced the decision
        forced: bool,
    },
    /// Finite-horizon step budget exhausted without a decision
    NoAction {
        /// Most probable target when the budget ran out
        best_candidate: TargetId,
        /// Belief mass of the best candidate
        score: f64,
    },
}

/// Read-only view of the current frame handed to a policy.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    /// Accepted frames this episode, including buffer warm-up
    pub frames: u32,
    /// Timestamp of the current frame in milliseconds
    pub timestamp_ms: f64,
    /// The evidence buffer (already containing the current sample)
    pub buffer: &'a EvidenceBuffer,
    /// Full-buffer correlation scores, one per target
    pub scores: &'a [TargetScore],
}

/// A stopping rule over per-frame correlation scores.
pub trait DecisionPolicy: Send {
    /// Registry name of this policy.
    fn name(&self) -> &'static str;

    /// Consume one frame of scores; called only once the buffer is ready.
    fn decide(&mut self, frame: &FrameView<'_>) -> AccumulationResult<Decision>;

    /// Observe a control event. Policies push any lifecycle diagnostics
    /// into `outputs`. The default implementation ignores everything.
    fn on_event(
        &mut self,
        event: &StreamRecord,
        outputs: &mut Vec<EngineOutput>,
    ) -> AccumulationResult<()> {
        let _ = (event, outputs);
        Ok(())
    }

    /// Clear episode accumulators. Long-lived state (calibration data,
    /// solved policies) survives.
    fn reset(&mut self);
}

/// Named policy selection with validated parameters.
///
/// The engine can be reconfigured mid-stream by deserializing one of these
/// and handing it to [`crate::AccumulationEngine::set_policy`]; unknown
/// names fail at deserialization, invalid parameters fail in [`build`].
///
/// [`build`]: PolicySpec::build
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PolicySpec {
    /// Majority vote over per-frame winners
    PrevalentTarget,
    /// Consecutive-streak rule with quality gates
    SteadyPred {
        /// Streak quality gates
        #[serde(default)]
        config: SteadyConfig,
    },
    /// Exponential momentum accumulation
    Momentum {
        /// Momentum parameters
        #[serde(default)]
        config: MomentumConfig,
    },
    /// Belief-tracking POMDP with an externally solved policy
    Pomdp {
        /// POMDP and solver parameters
        config: PomdpConfig,
    },
    /// Uniformly random decision once the buffer fills (demonstration)
    Random,
}

impl PolicySpec {
    /// Validate parameters and construct the policy.
    pub fn build(
        &self,
        codebook: Arc<CodeBook>,
        accumulation: &AccumulationConfig,
    ) -> AccumulationResult<Box<dyn DecisionPolicy>> {
        accumulation.validate()?;
        match self {
            Self::PrevalentTarget => Ok(Box::new(PrevalentTargetPolicy::new(
                codebook.num_targets(),
                accumulation,
            ))),
            Self::SteadyPred { config } => {
                config.validate()?;
                Ok(Box::new(SteadyPredPolicy::new(
                    codebook.num_targets(),
                    accumulation,
                    config.clone(),
                )))
            }
            Self::Momentum { config } => {
                config.validate()?;
                Ok(Box::new(MomentumPolicy::new(
                    codebook.num_targets(),
                    accumulation,
                    config.clone(),
                )))
            }
            Self::Pomdp { config } => {
                config.validate()?;
                Ok(Box::new(PomdpPolicy::new(
                    codebook,
                    accumulation,
                    config.clone(),
                )))
            }
            Self::Random => Ok(Box::new(RandomPolicy::new(codebook.num_targets()))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
