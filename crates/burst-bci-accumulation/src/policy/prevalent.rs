//! Majority vote over per-frame winning targets.
//!
//! Robust to isolated mis-scores: instead of requiring consecutive
//! agreement, the policy votes over the whole window of per-frame winners.

use tracing::debug;

use burst_bci_core::{AccumulationConfig, CorrelationScorer, TargetId};

use super::{Decision, DecisionPolicy, FrameView};
use crate::error::AccumulationResult;

/// Vote ratio a target must exceed, scaled by the number of targets.
const RATIO_FACTOR: f64 = 1.1;

/// Prevalent-target stopping rule.
pub struct PrevalentTargetPolicy {
    num_targets: usize,
    min_frames_pred: u32,
    max_frames_pred: u32,
    winners: Vec<usize>,
}

impl PrevalentTargetPolicy {
    /// Create the policy for `num_targets` targets.
    #[must_use]
    pub fn new(num_targets: usize, accumulation: &AccumulationConfig) -> Self {
        Self {
            num_targets,
            min_frames_pred: accumulation.min_frames_pred,
            max_frames_pred: accumulation.max_frames_pred,
            winners: Vec::new(),
        }
    }

    /// Most frequent winner and its count.
    fn mode(&self) -> (usize, usize) {
        let mut counts = vec![0usize; self.num_targets];
        for &winner in &self.winners {
            counts[winner] += 1;
        }
        counts
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(target, &count)| (target, count))
            .unwrap_or((0, 0))
    }
}

impl DecisionPolicy for PrevalentTargetPolicy {
    fn name(&self) -> &'static str {
        "prevalent_target"
    }

    fn decide(&mut self, frame: &FrameView<'_>) -> AccumulationResult<Decision> {
        let Some(winner) = CorrelationScorer::argmax(frame.scores) else {
            return Ok(Decision::Continue);
        };
        self.winners.push(winner);

        if self.winners.len() <= self.min_frames_pred as usize {
            return Ok(Decision::Continue);
        }

        let (candidate, count) = self.mode();
        let ratio = count as f64 / self.winners.len() as f64;
        if ratio > RATIO_FACTOR / self.num_targets as f64 {
            debug!(
                candidate,
                ratio,
                frame = frame.frames,
                votes = self.winners.len(),
                "prevalent candidate"
            );
            return Ok(Decision::Predict {
                target: TargetId::from(candidate),
                score: ratio,
                forced: false,
            });
        }

        if self.winners.len() >= self.max_frames_pred as usize {
            debug!(
                candidate,
                ratio,
                frame = frame.frames,
                "prevalent default candidate"
            );
            return Ok(Decision::Predict {
                target: TargetId::from(candidate),
                score: ratio,
                forced: true,
            });
        }

        Ok(Decision::Continue)
    }

    fn reset(&mut self) {
        self.winners.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
