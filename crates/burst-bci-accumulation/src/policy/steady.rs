//! Consecutive-streak stopping rule with quality gates.
//!
//! A streak only grows while the same target keeps winning with a
//! sufficiently high correlation and a positive margin over the runner-up.
//! This trades convergence speed for fewer false positives than plain
//! voting.

use tracing::debug;

use burst_bci_core::{AccumulationConfig, CorrelationScorer, SteadyConfig, TargetId};

use super::{Decision, DecisionPolicy, FrameView};
use crate::error::AccumulationResult;

/// Steady-prediction stopping rule.
pub struct SteadyPredPolicy {
    min_frames_pred: u32,
    max_frames_pred: u32,
    config: SteadyConfig,
    current_target: Option<usize>,
    streak: u32,
    counts: Vec<u32>,
}

impl SteadyPredPolicy {
    /// Create the policy for `num_targets` targets.
    #[must_use]
    pub fn new(
        num_targets: usize,
        accumulation: &AccumulationConfig,
        config: SteadyConfig,
    ) -> Self {
        Self {
            min_frames_pred: accumulation.min_frames_pred,
            max_frames_pred: accumulation.max_frames_pred,
            config,
            current_target: None,
            streak: 0,
            counts: vec![0; num_targets],
        }
    }

    /// Target with the highest cumulative win count.
    fn count_argmax(&self) -> usize {
        self.counts
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(target, _)| target)
            .unwrap_or(0)
    }
}

impl DecisionPolicy for SteadyPredPolicy {
    fn name(&self) -> &'static str {
        "steady_pred"
    }

    fn decide(&mut self, frame: &FrameView<'_>) -> AccumulationResult<Decision> {
        let Some(winner) = CorrelationScorer::argmax(frame.scores) else {
            return Ok(Decision::Continue);
        };
        let correlation = frame.scores[winner].correlation;
        let margin = correlation - CorrelationScorer::runner_up(frame.scores, winner);

        let continues = self.current_target == Some(winner)
            && correlation > self.config.correlation_threshold
            && margin > self.config.margin_threshold;
        if continues {
            self.streak += 1;
        } else {
            self.current_target = Some(winner);
            self.streak = 1;
        }
        self.counts[winner] += 1;

        if self.streak > self.min_frames_pred {
            let target = winner;
            debug!(
                candidate = target,
                streak = self.streak,
                frame = frame.frames,
                "steady candidate"
            );
            return Ok(Decision::Predict {
                target: TargetId::from(target),
                score: correlation,
                forced: false,
            });
        }

        if frame.frames >= self.max_frames_pred {
            let target = self.count_argmax();
            debug!(
                candidate = target,
                frame = frame.frames,
                counts = ?self.counts,
                "steady default candidate"
            );
            return Ok(Decision::Predict {
                target: TargetId::from(target),
                score: frame.scores[target].correlation,
                forced: true,
            });
        }

        Ok(Decision::Continue)
    }

    fn reset(&mut self) {
        self.current_target = None;
        self.streak = 0;
        self.counts.iter_mut().for_each(|count| *count = 0);
    }
}

// ============================================================================
// Tests
// ============================================================================
