//! Exponential momentum accumulation.
//!
//! A strict streak rule discards the information carried by a
//! nearly-complete streak the moment a single frame disagrees. Momentum
//! keeps that partial evidence: each target carries a momentum value that
//! grows exponentially with consecutive wins and decays while other
//! targets win. A winner change only restarts the exponential growth, it
//! never erases accumulated momentum.
//!
//! The momentum function is `f(k) = 2^(k / min_frames_pred) - 1`, so a
//! target reaches `f = 1` after `min_frames_pred` consecutive wins. Each
//! win adds `f(consec) - f(consec - 1)` to the winner and removes the same
//! amount from every other target still above the floor.

use tracing::debug;

use burst_bci_core::{AccumulationConfig, CorrelationScorer, MomentumConfig, TargetId};

use super::{Decision, DecisionPolicy, FrameView};
use crate::error::AccumulationResult;

/// Momentum-based stopping rule.
pub struct MomentumPolicy {
    min_frames_pred: u32,
    config: MomentumConfig,
    current_target: Option<usize>,
    consec: Vec<u32>,
    momentum: Vec<f64>,
}

impl MomentumPolicy {
    /// Create the policy for `num_targets` targets.
    #[must_use]
    pub fn new(
        num_targets: usize,
        accumulation: &AccumulationConfig,
        config: MomentumConfig,
    ) -> Self {
        let floor = config.momentum_floor;
        Self {
            min_frames_pred: accumulation.min_frames_pred,
            config,
            current_target: None,
            consec: vec![0; num_targets],
            momentum: vec![floor; num_targets],
        }
    }

    /// `f(k) = 2^(k / min_frames_pred) - 1`
    fn growth(&self, k: u32) -> f64 {
        (f64::from(k) / f64::from(self.min_frames_pred)).exp2() - 1.0
    }
}

impl DecisionPolicy for MomentumPolicy {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn decide(&mut self, frame: &FrameView<'_>) -> AccumulationResult<Decision> {
        let Some(winner) = CorrelationScorer::argmax(frame.scores) else {
            return Ok(Decision::Continue);
        };

        // A new winner restarts the exponential growth only
        if self.current_target != Some(winner) {
            self.consec.iter_mut().for_each(|count| *count = 0);
            self.current_target = Some(winner);
        }
        self.consec[winner] += 1;

        let increment = self.growth(self.consec[winner]) - self.growth(self.consec[winner] - 1);
        let rewarded = frame.scores[winner].correlation > self.config.correlation_threshold;
        for target in 0..self.momentum.len() {
            if target == winner && rewarded {
                self.momentum[target] += increment;
            } else if self.momentum[target] >= self.config.momentum_floor {
                self.momentum[target] -= increment;
            }
        }

        if self.momentum[winner] > self.config.momentum_threshold
            && self.consec[winner] > self.min_frames_pred
        {
            let total: f64 = self.momentum.iter().sum();
            if total <= 0.0 {
                return Ok(Decision::Continue);
            }
            let normalized: Vec<f64> = self.momentum.iter().map(|m| m / total).collect();
            let too_close = normalized
                .iter()
                .enumerate()
                .filter(|(target, _)| *target != winner)
                .any(|(_, &p)| normalized[winner] - p < self.config.tooclose_threshold);

            if too_close {
                // Ambiguous: halve everything and keep accumulating
                self.momentum.iter_mut().for_each(|m| *m /= 2.0);
                debug!(
                    momentum = ?self.momentum,
                    frame = frame.frames,
                    "prediction uncertain, momentum halved"
                );
                return Ok(Decision::Continue);
            }

            debug!(
                candidate = winner,
                frame = frame.frames,
                momentum = ?self.momentum,
                "momentum candidate"
            );
            return Ok(Decision::Predict {
                target: TargetId::from(winner),
                score: normalized[winner],
                forced: false,
            });
        }

        Ok(Decision::Continue)
    }

    fn reset(&mut self) {
        self.current_target = None;
        self.consec.iter_mut().for_each(|count| *count = 0);
        self.momentum
            .iter_mut()
            .for_each(|m| *m = self.config.momentum_floor);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use burst_bci_core::{EvidenceBuffer, TargetScore};

    fn config(min_frames: u32) -> AccumulationConfig {
        AccumulationConfig {
            min_buffer_size: 2,
            max_buffer_size: 50,
            min_frames_pred: min_frames,
            max_frames_pred: 300,
            recovery_ms: 300.0,
        }
    }

    fn feed(policy: &mut MomentumPolicy, correlations: &[f64], frame: u32) -> Decision {
        let buffer = EvidenceBuffer::new(2, 50);
        let scores: Vec<TargetScore> = correlations
            .iter()
            .enumerate()
            .map(|(index, &correlation)| TargetScore {
                target: TargetId::from(index),
                correlation,
                significance: 0.01,
            })
            .collect();
        let view = FrameView {
            frames: frame,
            timestamp_ms: frame as f64 * 16.6,
            buffer: &buffer,
            scores: &scores,
        };
        policy.decide(&view).unwrap()
    }

    #[test]
    fn test_sustained_winner_eventually_emits() {
        let mut policy = MomentumPolicy::new(3, &config(4), MomentumConfig::default());
        let mut emitted = None;
        for frame in 1..=30 {
            match feed(&mut policy, &[0.8, 0.1, 0.0], frame) {
                Decision::Continue => {}
                decision => {
                    emitted = Some(decision);
                    break;
                }
            }
        }
        match emitted.expect("a sustained winner must emit") {
            Decision::Predict { target, forced, .. } => {
                assert_eq!(target, TargetId(0));
                assert!(!forced);
            }
            other => panic!("expected prediction, got {other:?}"),
        }
    }

    #[test]
    fn test_alternating_winners_never_emit() {
        // Two equally attended targets with near-identical correlations
        // (|corr_a - corr_b| below the tie threshold) trading wins every
        // frame: no decision may ever come out of this.
        let mut policy = MomentumPolicy::new(2, &config(3), MomentumConfig::default());
        for frame in 1..=200u32 {
            let correlations = if frame % 2 == 0 { [0.70, 0.69] } else { [0.69, 0.70] };
            let decision = feed(&mut policy, &correlations, frame);
            assert_eq!(decision, Decision::Continue, "emitted at frame {frame}");
        }
    }

    #[test]
    fn test_too_close_guard_halves_near_tied_momenta() {
        let mut policy = MomentumPolicy::new(2, &config(10), MomentumConfig::default());
        // Target 1 carries momentum from earlier accumulation while
        // target 0 runs a long streak with a near-identical correlation.
        // Seeded so both momenta meet exactly when the stopping condition
        // first holds: the guard must halve and wait instead of deciding.
        let f11 = (11.0f64 / 10.0).exp2() - 1.0;
        policy.momentum = vec![0.0, 2.0 * f11];
        policy.current_target = Some(1);
        for frame in 1..=11u32 {
            let decision = feed(&mut policy, &[0.70, 0.69], frame);
            assert_eq!(decision, Decision::Continue, "emitted at frame {frame}");
        }
        // Both sat at f(11) when the check fired, then were halved
        assert!((policy.momentum[0] - f11 / 2.0).abs() < 1e-9);
        assert!((policy.momentum[1] - f11 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_interruption_preserves_momentum() {
        let mut policy = MomentumPolicy::new(3, &config(4), MomentumConfig::default());
        for frame in 1..=4 {
            feed(&mut policy, &[0.8, 0.1, 0.0], frame);
        }
        let before = policy.momentum[0];
        assert!(before > 0.0);
        // One dissenting frame restarts consec but keeps most momentum
        feed(&mut policy, &[0.1, 0.8, 0.0], 5);
        assert!(policy.momentum[0] > 0.0);
        assert_eq!(policy.consec[0], 0);
        assert_eq!(policy.consec[1], 1);
    }

    #[test]
    fn test_low_correlation_withholds_reward() {
        let gated = MomentumConfig {
            correlation_threshold: 0.5,
            ..Default::default()
        };
        let mut policy = MomentumPolicy::new(2, &config(3), gated);
        for frame in 1..=10 {
            assert_eq!(feed(&mut policy, &[0.3, 0.1], frame), Decision::Continue);
        }
        // Nothing above threshold: momentum never grew
        assert!(policy.momentum[0] <= 0.0 + 1e-12);
    }

    #[test]
    fn test_reset_restores_floor() {
        let floored = MomentumConfig {
            momentum_floor: 0.25,
            ..Default::default()
        };
        let mut policy = MomentumPolicy::new(2, &config(3), floored);
        for frame in 1..=5 {
            feed(&mut policy, &[0.9, 0.1], frame);
        }
        policy.reset();
        assert_eq!(policy.momentum, vec![0.25, 0.25]);
        assert_eq!(policy.consec, vec![0, 0]);
    }
}
