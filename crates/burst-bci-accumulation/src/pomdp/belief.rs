//! Bayesian belief tracking over the POMDP state space.

use super::model::{PomdpAction, PomdpModel};
use crate::error::{AccumulationError, AccumulationResult};

/// A probability distribution over the model's hidden states.
#[derive(Clone, Debug, PartialEq)]
pub struct Belief {
    probs: Vec<f64>,
}

impl Belief {
    /// The model's initial belief (uniform over step-0 target states).
    #[must_use]
    pub fn initial(model: &PomdpModel) -> Self {
        Self {
            probs: model.initial_belief(),
        }
    }

    /// State probabilities.
    #[must_use]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Standard Bayes filter step:
    /// `b'(s') ∝ O(o | s', a) * Σ_s T(s' | s, a) * b(s)`.
    ///
    /// An observation with zero likelihood under every reachable state
    /// zeroes the posterior; that is surfaced as an error rather than
    /// silently renormalized.
    pub fn update(
        &mut self,
        model: &PomdpModel,
        action: PomdpAction,
        observation: usize,
    ) -> AccumulationResult<()> {
        let num_states = self.probs.len();
        let mut posterior = vec![0.0; num_states];
        for next in 0..num_states {
            let mut predicted = 0.0;
            for state in 0..num_states {
                if self.probs[state] > 0.0 {
                    predicted += model.transition(state, action, next) * self.probs[state];
                }
            }
            posterior[next] = model.observation(action, next, observation) * predicted;
        }
        let total: f64 = posterior.iter().sum();
        if total <= 0.0 {
            return Err(AccumulationError::BeliefUnderflow { observation });
        }
        posterior.iter_mut().for_each(|value| *value /= total);
        self.probs = posterior;
        Ok(())
    }

    /// Belief mass of one target, summed over its step states in
    /// finite-horizon mode.
    #[must_use]
    pub fn target_mass(&self, model: &PomdpModel, target: usize) -> f64 {
        self.probs
            .iter()
            .enumerate()
            .filter(|(state, _)| model.state_target(*state) == Some(target))
            .map(|(_, &probability)| probability)
            .sum()
    }

    /// Most probable target and its belief mass, summed over the step
    /// states of each target in finite-horizon mode.
    #[must_use]
    pub fn most_probable_target(&self, model: &PomdpModel) -> (usize, f64) {
        let mut masses = vec![0.0; model.num_targets()];
        for (state, &probability) in self.probs.iter().enumerate() {
            if let Some(target) = model.state_target(state) {
                masses[target] += probability;
            }
        }
        masses
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(target, &mass)| (target, mass))
            .unwrap_or((0, 0.0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomdp::confusion::ConfusionMatrix;

    fn model() -> PomdpModel {
        let pairs: Vec<(usize, usize)> = (0..3).map(|t| (t, t)).collect();
        let confusion = ConfusionMatrix::from_pairs(3, &pairs).regularize(0.3);
        PomdpModel::new(confusion, None, 10.0, -100.0, -1.0)
    }

    #[test]
    fn test_initial_belief_is_uniform() {
        let model = model();
        let belief = Belief::initial(&model);
        for &probability in belief.probs() {
            assert!((probability - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_consistent_observations_concentrate_belief() {
        let model = model();
        let mut belief = Belief::initial(&model);
        for _ in 0..5 {
            belief.update(&model, PomdpAction::Wait, 1).unwrap();
        }
        let (target, mass) = belief.most_probable_target(&model);
        assert_eq!(target, 1);
        assert!(mass > 0.99);
    }

    #[test]
    fn test_decide_action_resets_toward_uniform() {
        let model = model();
        let mut belief = Belief::initial(&model);
        for _ in 0..5 {
            belief.update(&model, PomdpAction::Wait, 0).unwrap();
        }
        // Deciding mixes the state uniformly; the uninformative decide
        // observation leaves the posterior uniform too
        belief.update(&model, PomdpAction::Decide(0), 2).unwrap();
        for &probability in belief.probs() {
            assert!((probability - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_posterior_stays_normalized() {
        let model = model();
        let mut belief = Belief::initial(&model);
        for observation in [0, 2, 1, 1, 0, 1] {
            belief.update(&model, PomdpAction::Wait, observation).unwrap();
            let total: f64 = belief.probs().iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_finite_horizon_belief_marches_toward_terminal() {
        let pairs: Vec<(usize, usize)> = (0..2).map(|t| (t, t)).collect();
        let confusion = ConfusionMatrix::from_pairs(2, &pairs).regularize(0.3);
        let model = PomdpModel::new(confusion, Some(3), 10.0, -100.0, -1.0);
        let mut belief = Belief::initial(&model);
        // Two wait steps keep mass on target states, the third drains it
        // all into the terminal state
        belief.update(&model, PomdpAction::Wait, 0).unwrap();
        belief.update(&model, PomdpAction::Wait, 0).unwrap();
        let terminal = model.terminal_state().unwrap();
        assert!(belief.probs()[terminal] < 1e-12);
        belief.update(&model, PomdpAction::Wait, 0).unwrap();
        assert!((belief.probs()[terminal] - 1.0).abs() < 1e-9);
    }
}
