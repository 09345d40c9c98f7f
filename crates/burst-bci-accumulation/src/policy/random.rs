//! Random decision policy.
//!
//! Predicts a uniformly random target as soon as the buffer fills. No
//! practical use beyond demonstrating how little a [`DecisionPolicy`]
//! needs to implement; engine tests also use it as a trivially
//! always-deciding policy.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use burst_bci_core::TargetId;

use super::{Decision, DecisionPolicy, FrameView};
use crate::error::AccumulationResult;

/// Uniformly random decision once evidence is available.
pub struct RandomPolicy {
    num_targets: usize,
    rng: SmallRng,
}

impl RandomPolicy {
    /// Create the policy for `num_targets` targets.
    #[must_use]
    pub fn new(num_targets: usize) -> Self {
        Self {
            num_targets,
            rng: SmallRng::from_entropy(),
        }
    }
}

impl DecisionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide(&mut self, _frame: &FrameView<'_>) -> AccumulationResult<Decision> {
        let target = self.rng.gen_range(0..self.num_targets);
        Ok(Decision::Predict {
            target: TargetId::from(target),
            score: 1.0 / self.num_targets as f64,
            forced: false,
        })
    }

    fn reset(&mut self) {}
}
