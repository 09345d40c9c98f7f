//! Bounded FIFO buffer of per-frame evidence samples.
//!
//! One sample arrives per display frame: the classifier's "target present"
//! probability tagged with the phase index it was aligned to. The buffer is
//! circular with a hard capacity; samples only become usable for decisions
//! once the fill threshold is reached.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One frame of classifier evidence.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSample {
    /// Frame timestamp in milliseconds
    pub timestamp_ms: f64,
    /// Position inside the code cycle this sample is aligned to
    pub phase_index: usize,
    /// Classifier probability of the "target present" state, in [0, 1]
    pub probability: f64,
}

/// Circular buffer of evidence samples for one decision episode.
///
/// Invariant: the length never exceeds `max_size`; the oldest sample is
/// evicted first on overflow.
#[derive(Clone, Debug)]
pub struct EvidenceBuffer {
    samples: VecDeque<EvidenceSample>,
    min_size: usize,
    max_size: usize,
}

impl EvidenceBuffer {
    /// Create an empty buffer. Sizes are validated upstream by
    /// [`crate::config::AccumulationConfig::validate`].
    #[must_use]
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_size),
            min_size,
            max_size,
        }
    }

    /// Append a sample, evicting the oldest one if the buffer is full.
    pub fn push(&mut self, sample: EvidenceSample) {
        if self.samples.len() == self.max_size {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Whether enough samples accumulated to support a decision.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.samples.len() >= self.min_size
    }

    /// Current number of buffered samples.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fill threshold below which no decision is attempted.
    #[inline]
    #[must_use]
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// The probability trace, oldest first.
    #[must_use]
    pub fn probabilities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.probability).collect()
    }

    /// The phase-index trace, oldest first.
    #[must_use]
    pub fn phases(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.phase_index).collect()
    }

    /// The `n` most recent samples as (probabilities, phases), oldest
    /// first. Used by cadenced consumers that need fixed-size windows.
    #[must_use]
    pub fn recent(&self, n: usize) -> (Vec<f64>, Vec<usize>) {
        let skip = self.samples.len().saturating_sub(n);
        let probs = self.samples.iter().skip(skip).map(|s| s.probability).collect();
        let phases = self.samples.iter().skip(skip).map(|s| s.phase_index).collect();
        (probs, phases)
    }

    /// Discard all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
