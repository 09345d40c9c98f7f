//! POMDP problem construction.
//!
//! Hidden states are target identities (optionally crossed with a bounded
//! elapsed-step counter plus an absorbing terminal state in the
//! finite-horizon variant). Actions are `wait` and one `decide` per
//! target; observations are the discretized correlation-argmax targets,
//! with likelihoods taken from the calibrated confusion matrix. Rewards
//! encode the speed/accuracy trade-off.
//!
//! The model serializes itself in Cassandra `.pomdp` format for the
//! external point-based solver.

use std::fmt::Write as _;

use super::confusion::ConfusionMatrix;

/// An action of the decision POMDP.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PomdpAction {
    /// Keep observing
    Wait,
    /// Commit to a target
    Decide(usize),
}

impl PomdpAction {
    /// Actions are indexed `wait, decide_0, .., decide_{n-1}` in solver
    /// files and alpha vectors.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Self::Wait
        } else {
            Self::Decide(index - 1)
        }
    }

    /// Inverse of [`from_index`](Self::from_index).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Wait => 0,
            Self::Decide(target) => target + 1,
        }
    }
}

/// The decision POMDP over target-identity states.
#[derive(Clone, Debug)]
pub struct PomdpModel {
    num_targets: usize,
    /// Number of elapsed-step states in finite-horizon mode
    horizon: Option<usize>,
    confusion: ConfusionMatrix,
    hit_reward: f64,
    miss_cost: f64,
    wait_cost: f64,
}

impl PomdpModel {
    /// Build the model from a regularized confusion matrix.
    #[must_use]
    pub fn new(
        confusion: ConfusionMatrix,
        horizon: Option<usize>,
        hit_reward: f64,
        miss_cost: f64,
        wait_cost: f64,
    ) -> Self {
        Self {
            num_targets: confusion.num_targets(),
            horizon,
            confusion,
            hit_reward,
            miss_cost,
            wait_cost,
        }
    }

    /// Number of targets (also the number of observations).
    #[inline]
    #[must_use]
    pub fn num_targets(&self) -> usize {
        self.num_targets
    }

    /// Total number of hidden states.
    #[must_use]
    pub fn num_states(&self) -> usize {
        match self.horizon {
            Some(steps) => self.num_targets * steps + 1,
            None => self.num_targets,
        }
    }

    /// Number of actions: wait plus one decide per target.
    #[inline]
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.num_targets + 1
    }

    /// Index of the absorbing terminal state, if any.
    #[must_use]
    pub fn terminal_state(&self) -> Option<usize> {
        self.horizon.map(|steps| self.num_targets * steps)
    }

    /// Target identity of a state, `None` for the terminal state.
    #[must_use]
    pub fn state_target(&self, state: usize) -> Option<usize> {
        match self.horizon {
            Some(steps) => {
                if state == self.num_targets * steps {
                    None
                } else {
                    Some(state / steps)
                }
            }
            None => Some(state),
        }
    }

    /// Uniform initial belief over the step-0 target states.
    #[must_use]
    pub fn initial_belief(&self) -> Vec<f64> {
        let mut belief = vec![0.0; self.num_states()];
        let mass = 1.0 / self.num_targets as f64;
        match self.horizon {
            Some(steps) => {
                for target in 0..self.num_targets {
                    belief[target * steps] = mass;
                }
            }
            None => belief.iter_mut().for_each(|value| *value = mass),
        }
        belief
    }

    /// Transition probability `P(next | state, action)`.
    #[must_use]
    pub fn transition(&self, state: usize, action: PomdpAction, next: usize) -> f64 {
        fn certain(condition: bool) -> f64 {
            if condition {
                1.0
            } else {
                0.0
            }
        }
        match self.horizon {
            None => match action {
                // The attended target does not change while waiting
                PomdpAction::Wait => certain(state == next),
                // A decision starts a fresh trial with an unknown target
                PomdpAction::Decide(_) => 1.0 / self.num_targets as f64,
            },
            Some(steps) => {
                let terminal = self.num_targets * steps;
                if state == terminal {
                    return certain(next == terminal);
                }
                match action {
                    PomdpAction::Wait => {
                        let target = state / steps;
                        let step = state % steps;
                        if step + 1 < steps {
                            certain(next == target * steps + step + 1)
                        } else {
                            certain(next == terminal)
                        }
                    }
                    PomdpAction::Decide(_) => certain(next == terminal),
                }
            }
        }
    }

    /// Observation probability `P(observation | next, action)`.
    ///
    /// Waiting observes the classifier through the confusion matrix;
    /// decide actions and the terminal state are uninformative.
    #[must_use]
    pub fn observation(&self, action: PomdpAction, next: usize, observation: usize) -> f64 {
        let uniform = 1.0 / self.num_targets as f64;
        match action {
            PomdpAction::Decide(_) => uniform,
            PomdpAction::Wait => match self.state_target(next) {
                Some(target) => self.confusion.row(target)[observation],
                None => uniform,
            },
        }
    }

    /// Immediate reward `R(state, action)`.
    #[must_use]
    pub fn reward(&self, state: usize, action: PomdpAction) -> f64 {
        let Some(target) = self.state_target(state) else {
            return 0.0;
        };
        match action {
            PomdpAction::Wait => self.wait_cost,
            PomdpAction::Decide(decided) => {
                if decided == target {
                    self.hit_reward
                } else {
                    self.miss_cost
                }
            }
        }
    }

    /// State name in the solver file.
    fn state_name(&self, state: usize) -> String {
        match self.horizon {
            Some(steps) => {
                if state == self.num_targets * steps {
                    "term".to_owned()
                } else {
                    format!("s{}_{}", state / steps, state % steps)
                }
            }
            None => format!("s{state}"),
        }
    }

    /// Action name in the solver file, matching the action index order.
    fn action_name(action: PomdpAction) -> String {
        match action {
            PomdpAction::Wait => "a_wait".to_owned(),
            PomdpAction::Decide(target) => format!("a_decide_{target}"),
        }
    }

    /// Serialize the problem in Cassandra `.pomdp` format.
    #[must_use]
    pub fn to_pomdp_format(&self, discount: f64) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "discount: {discount}");
        let _ = writeln!(out, "values: reward");

        let states: Vec<String> = (0..self.num_states()).map(|s| self.state_name(s)).collect();
        let _ = writeln!(out, "states: {}", states.join(" "));

        let actions: Vec<String> = (0..self.num_actions())
            .map(|a| Self::action_name(PomdpAction::from_index(a)))
            .collect();
        let _ = writeln!(out, "actions: {}", actions.join(" "));

        let observations: Vec<String> =
            (0..self.num_targets).map(|o| format!("o{o}")).collect();
        let _ = writeln!(out, "observations: {}", observations.join(" "));

        let start: Vec<String> = self
            .initial_belief()
            .iter()
            .map(|value| format!("{value}"))
            .collect();
        let _ = writeln!(out, "start: {}", start.join(" "));
        let _ = writeln!(out);

        for action_index in 0..self.num_actions() {
            let action = PomdpAction::from_index(action_index);
            let name = Self::action_name(action);
            for state in 0..self.num_states() {
                for next in 0..self.num_states() {
                    let probability = self.transition(state, action, next);
                    if probability > 0.0 {
                        let _ = writeln!(
                            out,
                            "T: {name} : {} : {} {probability}",
                            self.state_name(state),
                            self.state_name(next),
                        );
                    }
                }
            }
            for next in 0..self.num_states() {
                for observation in 0..self.num_targets {
                    let probability = self.observation(action, next, observation);
                    if probability > 0.0 {
                        let _ = writeln!(
                            out,
                            "O: {name} : {} : o{observation} {probability}",
                            self.state_name(next),
                        );
                    }
                }
            }
            for state in 0..self.num_states() {
                let reward = self.reward(state, action);
                if reward != 0.0 {
                    let _ = writeln!(
                        out,
                        "R: {name} : {} : * : * {reward}",
                        self.state_name(state),
                    );
                }
            }
            let _ = writeln!(out);
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================
