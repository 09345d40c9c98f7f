//! Belief-tracking decision policy with an externally solved POMDP.
//!
//! The policy goes through a small lifecycle. It starts idle and behaves
//! like the streak-based fallback. A supervised episode
//! ([`StreamRecord::EpisodeBegins`] .. [`StreamRecord::EpisodeEnd`])
//! collects (predicted, cued) target pairs at the observation cadence;
//! when the episode ends the pairs become a confusion matrix, the matrix
//! becomes a POMDP, and the external SARSOP solver turns the POMDP into an
//! alpha-vector policy. From then on the policy tracks a belief over
//! targets, waiting or deciding as the solved value function dictates.
//!
//! A failed solve is reported but not fatal: the fallback keeps deciding
//! and a later supervised episode can try again.

mod belief;
mod confusion;
mod model;
mod solver;

use std::sync::Arc;

use tracing::{debug, info, warn};

use burst_bci_core::records::{EngineOutput, StreamRecord};
use burst_bci_core::{
    AccumulationConfig, CodeBook, CorrelationScorer, PomdpConfig, SteadyConfig, TargetId,
};

use crate::error::{AccumulationError, AccumulationResult};
use crate::policy::{Decision, DecisionPolicy, FrameView, SteadyPredPolicy};

pub use belief::Belief;
pub use confusion::ConfusionMatrix;
pub use model::{PomdpAction, PomdpModel};
pub use solver::{AlphaVector, AlphaVectorPolicy, SarsopSolver};

/// Lifecycle phase of the POMDP policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PomdpPhase {
    /// No calibration data yet; the fallback decides
    Idle,
    /// Supervised episode running; collecting (predicted, cued) pairs
    Calibrating,
    /// Calibration ended but no solved policy exists (solve failed)
    Solving,
    /// Solved; belief tracking drives decisions
    Deciding,
}

/// POMDP decision policy with streak-based fallback.
pub struct PomdpPolicy {
    config: PomdpConfig,
    min_buffer_size: usize,
    max_frames_pred: u32,
    num_targets: usize,
    scorer: CorrelationScorer,
    fallback: SteadyPredPolicy,
    phase: PomdpPhase,
    current_cue: Option<usize>,
    pairs: Vec<(usize, usize)>,
    model: Option<PomdpModel>,
    policy: Option<AlphaVectorPolicy>,
    belief: Option<Belief>,
}

impl PomdpPolicy {
    /// Create the policy. The fallback uses the default streak gates.
    #[must_use]
    pub fn new(
        codebook: Arc<CodeBook>,
        accumulation: &AccumulationConfig,
        config: PomdpConfig,
    ) -> Self {
        let num_targets = codebook.num_targets();
        Self {
            min_buffer_size: accumulation.min_buffer_size,
            max_frames_pred: accumulation.max_frames_pred,
            num_targets,
            scorer: CorrelationScorer::new(codebook),
            fallback: SteadyPredPolicy::new(num_targets, accumulation, SteadyConfig::default()),
            config,
            phase: PomdpPhase::Idle,
            current_cue: None,
            pairs: Vec::new(),
            model: None,
            policy: None,
            belief: None,
        }
    }

    /// The discretized observation for this frame: the correlation argmax
    /// over a fixed-size window of the most recent samples. `None` off the
    /// cadence or while the window is short.
    fn observe(&self, frame: &FrameView<'_>) -> Option<usize> {
        if frame.frames % self.config.pomdp_step != 0
            || frame.buffer.len() < self.min_buffer_size
        {
            return None;
        }
        let (probabilities, phases) = frame.buffer.recent(self.min_buffer_size);
        let scores = self.scorer.score_all(&probabilities, &phases);
        CorrelationScorer::argmax(&scores)
    }

    /// Number of reachable observation points in finite-horizon mode.
    ///
    /// Observations cannot start before the buffer holds
    /// `min_buffer_size` samples, so the horizon spans the cadence points
    /// from that frame up to the frame budget, inclusive.
    fn horizon_steps(&self) -> usize {
        let span = self.max_frames_pred.saturating_sub(self.min_buffer_size as u32);
        (span / self.config.pomdp_step + 1) as usize
    }

    /// Build and solve the POMDP from the collected calibration pairs.
    fn solve(&mut self) -> AccumulationResult<()> {
        if self.pairs.is_empty() {
            return Err(AccumulationError::EmptyCalibration);
        }
        let confusion = ConfusionMatrix::from_pairs(self.num_targets, &self.pairs)
            .regularize(self.config.norm_value);
        let horizon = self.config.finite_horizon.then(|| self.horizon_steps());
        let model = PomdpModel::new(
            confusion,
            horizon,
            self.config.hit_reward,
            self.config.miss_cost,
            self.config.wait_cost,
        );
        let solver = SarsopSolver::new(
            self.config.solver_path.clone(),
            self.config.timeout_s,
            self.config.memory_mb,
            self.config.precision,
        );
        let policy = solver.solve(&model, self.config.effective_discount())?;
        info!(
            pairs = self.pairs.len(),
            states = model.num_states(),
            "solved decision problem"
        );
        self.belief = Some(Belief::initial(&model));
        self.model = Some(model);
        self.policy = Some(policy);
        self.phase = PomdpPhase::Deciding;
        Ok(())
    }
}

impl DecisionPolicy for PomdpPolicy {
    fn name(&self) -> &'static str {
        "pomdp"
    }

    fn decide(&mut self, frame: &FrameView<'_>) -> AccumulationResult<Decision> {
        let observation = self.observe(frame);

        if self.phase != PomdpPhase::Deciding {
            if self.phase == PomdpPhase::Calibrating {
                if let (Some(observation), Some(cue)) = (observation, self.current_cue) {
                    self.pairs.push((observation, cue));
                }
            }
            return self.fallback.decide(frame);
        }

        let Some(observation) = observation else {
            return Ok(Decision::Continue);
        };
        // Phase invariant: Deciding implies model, policy, and belief
        let (Some(model), Some(policy), Some(belief)) =
            (&self.model, &self.policy, &mut self.belief)
        else {
            return Ok(Decision::Continue);
        };

        // The step budget preempts whatever the value function plans,
        // and it reads the belief before the update would march the last
        // step into the terminal state
        if self.config.finite_horizon && frame.frames >= self.max_frames_pred {
            let (target, score) = belief.most_probable_target(model);
            *belief = Belief::initial(model);
            return Ok(Decision::NoAction {
                best_candidate: TargetId::from(target),
                score,
            });
        }

        let action = policy.plan(belief.probs());
        match action {
            PomdpAction::Decide(target) => {
                let score = belief.target_mass(model, target);
                debug!(
                    candidate = target,
                    belief = score,
                    frame = frame.frames,
                    "belief candidate"
                );
                *belief = Belief::initial(model);
                Ok(Decision::Predict {
                    target: TargetId::from(target),
                    score,
                    forced: false,
                })
            }
            PomdpAction::Wait => {
                belief.update(model, PomdpAction::Wait, observation)?;
                Ok(Decision::Continue)
            }
        }
    }

    fn on_event(
        &mut self,
        event: &StreamRecord,
        outputs: &mut Vec<EngineOutput>,
    ) -> AccumulationResult<()> {
        match event {
            StreamRecord::EpisodeBegins => {
                self.phase = PomdpPhase::Calibrating;
                self.pairs.clear();
                self.current_cue = None;
                outputs.push(EngineOutput::CalibrationStarted);
                info!("supervised calibration started");
            }
            StreamRecord::Cue { target } => {
                if target.index() >= self.num_targets {
                    warn!(
                        %target,
                        num_targets = self.num_targets,
                        "dropping cue for unknown target"
                    );
                    return Ok(());
                }
                self.current_cue = Some(target.index());
            }
            StreamRecord::EpisodeEnd => {
                if self.phase != PomdpPhase::Calibrating {
                    return Ok(());
                }
                match self.solve() {
                    Ok(()) => outputs.push(EngineOutput::PolicySolved),
                    Err(error) => {
                        warn!(%error, "solve failed, keeping fallback policy");
                        self.phase = PomdpPhase::Solving;
                        return Err(error);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.fallback.reset();
        if let (Some(model), Some(belief)) = (&self.model, &mut self.belief) {
            *belief = Belief::initial(model);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use burst_bci_core::{EvidenceBuffer, EvidenceSample};

    fn codebook() -> Arc<CodeBook> {
        Arc::new(CodeBook::parse(&["0101", "0011"]).unwrap())
    }

    fn accumulation() -> AccumulationConfig {
        AccumulationConfig {
            min_buffer_size: 4,
            max_buffer_size: 50,
            min_frames_pred: 100,
            max_frames_pred: 300,
            recovery_ms: 300.0,
        }
    }

    fn pomdp_config(solver_path: PathBuf) -> PomdpConfig {
        PomdpConfig {
            pomdp_step: 1,
            solver_path,
            ..Default::default()
        }
    }

    /// A stand-in solver that ignores the problem and emits a fixed
    /// two-state alpha-vector policy.
    fn stub_solver(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("pomdpsol");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r##"#!/bin/sh
out=""
while [ "$#" -gt 1 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  shift
done
cat > "$out" <<'EOF'
<Policy version="0.1" type="value">
  <AlphaVector vectorLength="2" numObsValue="1" numVectors="3">
    <Vector action="0" obsValue="0">-2.0 -2.0 </Vector>
    <Vector action="1" obsValue="0">10.0 -100.0 </Vector>
    <Vector action="2" obsValue="0">-100.0 10.0 </Vector>
  </AlphaVector>
</Policy>
EOF
"##
        )
        .unwrap();
        let mut permissions = file.metadata().unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&path, permissions).unwrap();
        path
    }

    /// Drive one frame whose buffered trace follows the given target's
    /// code exactly.
    fn feed(policy: &mut PomdpPolicy, target: usize, frame: u32) -> Decision {
        let book = codebook();
        let code = book.code(TargetId::from(target)).unwrap();
        let mut buffer = EvidenceBuffer::new(4, 50);
        for i in 0..8usize {
            let phase = i % book.code_len();
            buffer.push(EvidenceSample {
                timestamp_ms: i as f64 * 16.6,
                phase_index: phase,
                probability: f64::from(code.bit(phase)),
            });
        }
        let scorer = CorrelationScorer::new(book);
        let scores = scorer.score_all(&buffer.probabilities(), &buffer.phases());
        let view = FrameView {
            frames: frame,
            timestamp_ms: f64::from(frame) * 16.6,
            buffer: &buffer,
            scores: &scores,
        };
        policy.decide(&view).unwrap()
    }

    #[test]
    fn test_episode_begins_starts_calibration() {
        let mut policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            pomdp_config(PathBuf::from("/nonexistent/pomdpsol")),
        );
        let mut outputs = Vec::new();
        policy
            .on_event(&StreamRecord::EpisodeBegins, &mut outputs)
            .unwrap();
        assert_eq!(outputs, vec![EngineOutput::CalibrationStarted]);
        assert_eq!(policy.phase, PomdpPhase::Calibrating);
    }

    #[test]
    fn test_empty_calibration_is_an_error() {
        let mut policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            pomdp_config(PathBuf::from("/nonexistent/pomdpsol")),
        );
        let mut outputs = Vec::new();
        policy
            .on_event(&StreamRecord::EpisodeBegins, &mut outputs)
            .unwrap();
        let error = policy
            .on_event(&StreamRecord::EpisodeEnd, &mut outputs)
            .unwrap_err();
        assert!(matches!(error, AccumulationError::EmptyCalibration));
        assert_eq!(policy.phase, PomdpPhase::Solving);
    }

    #[test]
    fn test_failed_solve_keeps_fallback_running() {
        let mut policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            pomdp_config(PathBuf::from("/nonexistent/pomdpsol")),
        );
        let mut outputs = Vec::new();
        policy
            .on_event(&StreamRecord::EpisodeBegins, &mut outputs)
            .unwrap();
        policy
            .on_event(&StreamRecord::Cue { target: TargetId(0) }, &mut outputs)
            .unwrap();
        feed(&mut policy, 0, 1);
        let error = policy
            .on_event(&StreamRecord::EpisodeEnd, &mut outputs)
            .unwrap_err();
        assert!(matches!(
            error,
            AccumulationError::Solver(crate::error::SolverError::Launch { .. })
        ));
        // Still decides through the fallback
        assert!(matches!(feed(&mut policy, 0, 2), Decision::Continue));
    }

    #[test]
    fn test_calibrate_solve_and_track_belief() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy =
            PomdpPolicy::new(codebook(), &accumulation(), pomdp_config(stub_solver(dir.path())));

        let mut outputs = Vec::new();
        policy
            .on_event(&StreamRecord::EpisodeBegins, &mut outputs)
            .unwrap();
        policy
            .on_event(&StreamRecord::Cue { target: TargetId(0) }, &mut outputs)
            .unwrap();
        for frame in 1..=4 {
            feed(&mut policy, 0, frame);
        }
        assert_eq!(policy.pairs, vec![(0, 0); 4]);

        policy
            .on_event(&StreamRecord::EpisodeEnd, &mut outputs)
            .unwrap();
        assert_eq!(
            outputs,
            vec![EngineOutput::CalibrationStarted, EngineOutput::PolicySolved]
        );
        assert_eq!(policy.phase, PomdpPhase::Deciding);

        // Uniform belief plans wait; consistent observations of target 0
        // concentrate the belief until decide_0 dominates
        let mut decided = None;
        for frame in 1..=20 {
            match feed(&mut policy, 0, frame) {
                Decision::Continue => {}
                decision => {
                    decided = Some(decision);
                    break;
                }
            }
        }
        match decided.expect("belief must eventually commit") {
            Decision::Predict { target, score, forced } => {
                assert_eq!(target, TargetId(0));
                assert!(score > 0.5);
                assert!(!forced);
            }
            other => panic!("expected prediction, got {other:?}"),
        }
        // The belief restarts uniform after a decision
        let belief = policy.belief.as_ref().unwrap();
        for &probability in belief.probs() {
            assert!((probability - 0.5).abs() < 1e-12);
        }
    }

    /// Hand-install a solved policy with one alpha vector per given
    /// action index, each constant across the model's states.
    fn install_solved(policy: &mut PomdpPolicy, steps: usize, actions: &[(usize, f64)]) {
        let confusion = ConfusionMatrix::from_pairs(2, &[(0, 0), (1, 1)]).regularize(0.3);
        let model = PomdpModel::new(confusion, Some(steps), 10.0, -100.0, -1.0);
        let num_states = model.num_states();
        let xml: String = actions
            .iter()
            .map(|(action, value)| {
                format!(
                    "<Vector action=\"{action}\" obsValue=\"0\">{}</Vector>",
                    vec![value.to_string(); num_states].join(" ")
                )
            })
            .collect();
        policy.policy = Some(AlphaVectorPolicy::parse(&xml, num_states).unwrap());
        policy.belief = Some(Belief::initial(&model));
        policy.model = Some(model);
        policy.phase = PomdpPhase::Deciding;
    }

    #[test]
    fn test_horizon_counts_reachable_observation_points() {
        // Observations start once the buffer holds min_buffer_size
        // samples, so only (max - min_buffer) / step + 1 cadence points
        // fit before the frame budget
        let policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            pomdp_config(PathBuf::from("unused")),
        );
        assert_eq!(policy.horizon_steps(), 297);

        let policy = PomdpPolicy::new(
            codebook(),
            &AccumulationConfig::default(),
            PomdpConfig {
                solver_path: PathBuf::from("unused"),
                ..Default::default()
            },
        );
        assert_eq!(policy.horizon_steps(), 46);
    }

    #[test]
    fn test_finite_horizon_budget_emits_no_action() {
        let mut policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            PomdpConfig {
                pomdp_step: 1,
                finite_horizon: true,
                solver_path: PathBuf::from("unused"),
                ..Default::default()
            },
        );
        // Always-wait value function over the reachable-step horizon
        let steps = policy.horizon_steps();
        install_solved(&mut policy, steps, &[(0, -1.0)]);

        // Observations begin when the buffer fills at frame 4; the
        // budget preempts the last cadence point at frame 300
        for frame in 4..=299 {
            assert_eq!(feed(&mut policy, 0, frame), Decision::Continue);
        }
        match feed(&mut policy, 0, 300) {
            Decision::NoAction { best_candidate, score } => {
                assert_eq!(best_candidate, TargetId(0));
                assert!(score > 0.5);
            }
            other => panic!("expected no-action, got {other:?}"),
        }
    }

    #[test]
    fn test_budget_preempts_planned_decision() {
        let mut policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            PomdpConfig {
                pomdp_step: 1,
                finite_horizon: true,
                solver_path: PathBuf::from("unused"),
                ..Default::default()
            },
        );
        // A value function that always argues for deciding target 0
        let steps = policy.horizon_steps();
        install_solved(&mut policy, steps, &[(1, 10.0)]);

        // At the frame budget the no-action record wins over the plan
        match feed(&mut policy, 0, 300) {
            Decision::NoAction { score, .. } => {
                assert!((score - 0.5).abs() < 1e-12);
            }
            other => panic!("expected no-action, got {other:?}"),
        }
        // Below the budget the same plan decides immediately
        assert!(matches!(
            feed(&mut policy, 0, 4),
            Decision::Predict { target: TargetId(0), .. }
        ));
    }

    #[test]
    fn test_out_of_range_cue_is_dropped() {
        let mut policy = PomdpPolicy::new(
            codebook(),
            &accumulation(),
            pomdp_config(PathBuf::from("unused")),
        );
        let mut outputs = Vec::new();
        policy
            .on_event(&StreamRecord::EpisodeBegins, &mut outputs)
            .unwrap();
        policy
            .on_event(&StreamRecord::Cue { target: TargetId(9) }, &mut outputs)
            .unwrap();
        assert_eq!(policy.current_cue, None);
        // Calibration frames without a valid cue collect no pairs
        feed(&mut policy, 0, 1);
        assert!(policy.pairs.is_empty());

        policy
            .on_event(&StreamRecord::Cue { target: TargetId(1) }, &mut outputs)
            .unwrap();
        assert_eq!(policy.current_cue, Some(1));
    }
}
