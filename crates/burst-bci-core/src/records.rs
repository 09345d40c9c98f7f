//! Stream records exchanged with the surrounding runtime.
//!
//! Input is a single stream interleaving classifier samples and control
//! events; output is either silence or a prediction record, plus POMDP
//! lifecycle diagnostics. Records serialize as JSON tagged by `label`,
//! matching the event wire format of the delivering runtime.

use serde::{Deserialize, Serialize};

use crate::types::TargetId;

/// One record of the input stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum StreamRecord {
    /// A per-frame classifier probability aligned to a code phase
    Sample {
        /// Frame timestamp in milliseconds
        timestamp_ms: f64,
        /// Position inside the code cycle
        phase_index: usize,
        /// Probability of the "target present" state, in [0, 1]
        probability: f64,
    },
    /// Discard all accumulation state immediately
    Reset,
    /// A supervised episode begins (starts POMDP calibration)
    EpisodeBegins,
    /// The supervised episode ends (triggers POMDP solving)
    EpisodeEnd,
    /// Ground-truth cue for the current supervised trial
    Cue {
        /// The cued target
        target: TargetId,
    },
}

/// A final target decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Timestamp of the frame that triggered the decision, in milliseconds
    pub timestamp_ms: f64,
    /// The decided target
    pub target: TargetId,
    /// Policy-specific decision score (vote ratio, correlation, or belief)
    pub score: f64,
    /// Frames consumed by this episode, including buffer warm-up
    pub frames_used: u32,
    /// Whether the frame budget forced the decision with weaker evidence
    pub forced: bool,
}

/// One record of the output stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum EngineOutput {
    /// A target decision
    Predict(Prediction),
    /// Finite-horizon step budget exhausted without a decision
    NoAction {
        /// Timestamp of the frame that exhausted the budget
        timestamp_ms: f64,
        /// Most probable target under the final belief
        best_candidate: TargetId,
        /// Belief mass of the best candidate
        score: f64,
        /// Frames consumed by this episode
        frames_used: u32,
    },
    /// POMDP policy entered its supervised calibration phase
    CalibrationStarted,
    /// The external solver returned a policy; belief tracking is active
    PolicySolved,
}

// ============================================================================
// Tests
// ============================================================================
