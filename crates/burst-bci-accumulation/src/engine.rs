//! The accumulation engine: buffer, scorer, policy, and refractory logic.
//!
//! The engine is the single entry point of the crate. It consumes the
//! interleaved input stream one record at a time and returns the output
//! records each input produced, usually none. Samples are validated,
//! refractory-filtered, buffered, scored against the codebook, and handed
//! to the active stopping-rule policy; control events go to the policy
//! directly.
//!
//! After every decision the engine goes refractory: samples inside the
//! recovery window are dropped, and each dropped sample restarts the
//! window. Accumulation only resumes after a full quiet window, so stale
//! evidence from the previous selection never leaks into the next episode.

use std::sync::Arc;

use tracing::{debug, warn};

use burst_bci_core::records::{EngineOutput, Prediction, StreamRecord};
use burst_bci_core::{
    AccumulationConfig, CodeBook, CorrelationScorer, EvidenceBuffer, EvidenceSample,
};

use crate::error::AccumulationResult;
use crate::policy::{Decision, DecisionPolicy, FrameView, PolicySpec};

/// Online evidence-accumulation and decision engine.
pub struct AccumulationEngine {
    codebook: Arc<CodeBook>,
    config: AccumulationConfig,
    scorer: CorrelationScorer,
    buffer: EvidenceBuffer,
    policy: Box<dyn DecisionPolicy>,
    /// Accepted frames this episode, including buffer warm-up
    frames: u32,
    /// Timestamp of the last decision or refractory-dropped sample
    refractory_mark: Option<f64>,
}

impl AccumulationEngine {
    /// Create an engine with a validated configuration and policy.
    pub fn new(
        codebook: Arc<CodeBook>,
        config: AccumulationConfig,
        spec: &PolicySpec,
    ) -> AccumulationResult<Self> {
        let policy = spec.build(codebook.clone(), &config)?;
        Ok(Self {
            scorer: CorrelationScorer::new(codebook.clone()),
            buffer: EvidenceBuffer::new(config.min_buffer_size, config.max_buffer_size),
            codebook,
            config,
            policy,
            frames: 0,
            refractory_mark: None,
        })
    }

    /// Name of the active policy.
    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Accepted frames in the current episode.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Swap the stopping-rule policy mid-stream. The current episode is
    /// abandoned; the refractory state is untouched.
    pub fn set_policy(&mut self, spec: &PolicySpec) -> AccumulationResult<()> {
        self.policy = spec.build(self.codebook.clone(), &self.config)?;
        self.episode_reset();
        Ok(())
    }

    /// Consume one input record and return whatever outputs it produced.
    pub fn push(&mut self, record: &StreamRecord) -> AccumulationResult<Vec<EngineOutput>> {
        match record {
            StreamRecord::Sample {
                timestamp_ms,
                phase_index,
                probability,
            } => self.push_sample(*timestamp_ms, *phase_index, *probability),
            StreamRecord::Reset => {
                self.reset();
                Ok(Vec::new())
            }
            event => {
                let mut outputs = Vec::new();
                self.policy.on_event(event, &mut outputs)?;
                Ok(outputs)
            }
        }
    }

    /// Discard all accumulation state, including the refractory window.
    pub fn reset(&mut self) {
        self.episode_reset();
        self.refractory_mark = None;
    }

    fn episode_reset(&mut self) {
        self.buffer.clear();
        self.frames = 0;
        self.policy.reset();
    }

    fn push_sample(
        &mut self,
        timestamp_ms: f64,
        phase_index: usize,
        probability: f64,
    ) -> AccumulationResult<Vec<EngineOutput>> {
        if phase_index >= self.codebook.code_len() {
            warn!(
                phase_index,
                code_len = self.codebook.code_len(),
                "dropping sample with out-of-range phase index"
            );
            return Ok(Vec::new());
        }
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            warn!(probability, "dropping sample with invalid probability");
            return Ok(Vec::new());
        }

        // Every sample inside the recovery window restarts it
        if let Some(mark) = self.refractory_mark {
            if timestamp_ms - mark < self.config.recovery_ms {
                self.refractory_mark = Some(timestamp_ms);
                return Ok(Vec::new());
            }
            self.refractory_mark = None;
        }

        self.frames += 1;
        self.buffer.push(EvidenceSample {
            timestamp_ms,
            phase_index,
            probability,
        });
        if !self.buffer.is_ready() {
            return Ok(Vec::new());
        }

        let scores = self
            .scorer
            .score_all(&self.buffer.probabilities(), &self.buffer.phases());
        let view = FrameView {
            frames: self.frames,
            timestamp_ms,
            buffer: &self.buffer,
            scores: &scores,
        };
        match self.policy.decide(&view)? {
            Decision::Continue => Ok(Vec::new()),
            Decision::Predict {
                target,
                score,
                forced,
            } => {
                debug!(
                    %target,
                    score,
                    forced,
                    frames = self.frames,
                    policy = self.policy.name(),
                    "prediction"
                );
                let prediction = Prediction {
                    timestamp_ms,
                    target,
                    score,
                    frames_used: self.frames,
                    forced,
                };
                self.episode_reset();
                self.refractory_mark = Some(timestamp_ms);
                Ok(vec![EngineOutput::Predict(prediction)])
            }
            Decision::NoAction {
                best_candidate,
                score,
            } => {
                debug!(
                    %best_candidate,
                    score,
                    frames = self.frames,
                    "step budget exhausted without a decision"
                );
                let output = EngineOutput::NoAction {
                    timestamp_ms,
                    best_candidate,
                    score,
                    frames_used: self.frames,
                };
                self.episode_reset();
                self.refractory_mark = Some(timestamp_ms);
                Ok(vec![output])
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
