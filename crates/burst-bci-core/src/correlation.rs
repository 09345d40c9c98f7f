//! Pearson correlation scoring of the evidence trace against the codebook.
//!
//! For each target, the buffered probability trace is compared against the
//! target's reference code sampled at the buffered phase indices. The
//! scorer is a pure function of its inputs: no side effects, deterministic.
//!
//! Degenerate traces (zero variance on either side, or too few samples)
//! would make the correlation coefficient undefined. Instead of letting a
//! not-a-number propagate, the scorer forces the correlation to 0 and the
//! significance to a small positive floor.

use std::sync::Arc;

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::types::{CodeBook, TargetId};

/// Significance value reported for degenerate inputs instead of NaN.
pub const DEGENERATE_SIGNIFICANCE: f64 = 1e-8;

/// Correlation result for a single target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TargetScore {
    /// The scored target
    pub target: TargetId,
    /// Pearson correlation coefficient in [-1, 1]
    pub correlation: f64,
    /// Two-sided significance value of the correlation
    pub significance: f64,
}

/// Scores the evidence trace against every code in the book.
#[derive(Clone, Debug)]
pub struct CorrelationScorer {
    codebook: Arc<CodeBook>,
}

impl CorrelationScorer {
    /// Create a scorer over a shared codebook.
    #[must_use]
    pub fn new(codebook: Arc<CodeBook>) -> Self {
        Self { codebook }
    }

    /// The codebook this scorer reads from.
    #[must_use]
    pub fn codebook(&self) -> &Arc<CodeBook> {
        &self.codebook
    }

    /// Score the trace `probabilities` aligned at `phases` against every
    /// code. Both slices have equal length; `phases` entries are valid
    /// phase indices for the shared code length.
    #[must_use]
    pub fn score_all(&self, probabilities: &[f64], phases: &[usize]) -> Vec<TargetScore> {
        debug_assert_eq!(probabilities.len(), phases.len());
        self.codebook
            .iter()
            .map(|(target, code)| {
                let template: Vec<f64> =
                    phases.iter().map(|&phase| f64::from(code.bit(phase))).collect();
                let (correlation, significance) = pearson(probabilities, &template);
                TargetScore {
                    target,
                    correlation,
                    significance,
                }
            })
            .collect()
    }

    /// Index of the highest-correlation score, if any.
    #[must_use]
    pub fn argmax(scores: &[TargetScore]) -> Option<usize> {
        scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.correlation.total_cmp(&b.correlation))
            .map(|(index, _)| index)
    }

    /// Highest correlation among targets other than `exclude`.
    #[must_use]
    pub fn runner_up(scores: &[TargetScore], exclude: usize) -> f64 {
        scores
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != exclude)
            .map(|(_, score)| score.correlation)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Pearson correlation with a two-sided significance value.
///
/// Returns `(0.0, DEGENERATE_SIGNIFICANCE)` whenever the coefficient is
/// undefined: fewer than 3 samples, or zero variance on either input.
fn pearson(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len();
    if n < 3 || n != y.len() {
        return (0.0, DEGENERATE_SIGNIFICANCE);
    }

    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < 1e-12 || var_y < 1e-12 {
        return (0.0, DEGENERATE_SIGNIFICANCE);
    }

    let r = (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    if !r.is_finite() {
        return (0.0, DEGENERATE_SIGNIFICANCE);
    }

    (r, significance(r, n))
}

/// Two-sided p-value of a Pearson coefficient via the t distribution with
/// n - 2 degrees of freedom.
fn significance(r: f64, n: usize) -> f64 {
    let dof = (n - 2) as f64;
    let denominator = 1.0 - r * r;
    if denominator < 1e-12 {
        // |r| == 1: the t statistic diverges, the p-value underflows
        return DEGENERATE_SIGNIFICANCE;
    }
    let t = r.abs() * (dof / denominator).sqrt();
    match StudentsT::new(0.0, 1.0, dof) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t))).max(DEGENERATE_SIGNIFICANCE),
        Err(_) => DEGENERATE_SIGNIFICANCE,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeBook;

    fn scorer(codes: &[&str]) -> CorrelationScorer {
        CorrelationScorer::new(Arc::new(CodeBook::parse(codes).unwrap()))
    }

    #[test]
    fn test_constant_trace_scores_zero_everywhere() {
        let scorer = scorer(&["010101", "001100", "111000"]);
        for value in [0.0, 0.5, 1.0] {
            let probs = vec![value; 6];
            let phases = vec![0, 1, 2, 3, 4, 5];
            let scores = scorer.score_all(&probs, &phases);
            assert_eq!(scores.len(), 3);
            for score in &scores {
                assert_eq!(score.correlation, 0.0);
                assert_eq!(score.significance, DEGENERATE_SIGNIFICANCE);
                assert!(score.correlation.is_finite());
            }
        }
    }

    #[test]
    fn test_constant_code_slice_scores_zero() {
        // Phases that only ever touch the zero bits of the first code
        let scorer = scorer(&["000111", "010101"]);
        let probs = vec![0.9, 0.1, 0.8, 0.2];
        let phases = vec![0, 1, 2, 0];
        let scores = scorer.score_all(&probs, &phases);
        assert_eq!(scores[0].correlation, 0.0);
        assert_eq!(scores[0].significance, DEGENERATE_SIGNIFICANCE);
    }

    #[test]
    fn test_matching_trace_correlates_perfectly() {
        let scorer = scorer(&["0110100110", "1001011001"]);
        let phases: Vec<usize> = (0..10).collect();
        let probs: Vec<f64> = "0110100110".chars().map(|c| if c == '1' { 1.0 } else { 0.0 }).collect();
        let scores = scorer.score_all(&probs, &phases);
        assert!((scores[0].correlation - 1.0).abs() < 1e-12);
        assert!((scores[1].correlation + 1.0).abs() < 1e-12);
        // Perfect correlation hits the significance floor, never NaN
        assert_eq!(scores[0].significance, DEGENERATE_SIGNIFICANCE);
    }

    #[test]
    fn test_significance_decreases_with_sample_count() {
        let scorer = scorer(&["01101001"]);
        let noisy = |n: usize| -> (Vec<f64>, Vec<usize>) {
            let phases: Vec<usize> = (0..n).map(|i| i % 8).collect();
            let probs = phases
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    let bit = f64::from([0, 1, 1, 0, 1, 0, 0, 1][p]);
                    0.8 * bit + 0.1 + 0.05 * ((i % 3) as f64)
                })
                .collect();
            (probs, phases)
        };
        let (probs, phases) = noisy(8);
        let short = scorer.score_all(&probs, &phases)[0];
        let (probs, phases) = noisy(64);
        let long = scorer.score_all(&probs, &phases)[0];
        assert!(long.significance <= short.significance);
    }

    #[test]
    fn test_argmax_and_runner_up() {
        let scores = vec![
            TargetScore {
                target: TargetId(0),
                correlation: 0.2,
                significance: 0.5,
            },
            TargetScore {
                target: TargetId(1),
                correlation: 0.9,
                significance: 0.01,
            },
            TargetScore {
                target: TargetId(2),
                correlation: -0.3,
                significance: 0.8,
            },
        ];
        assert_eq!(CorrelationScorer::argmax(&scores), Some(1));
        assert!((CorrelationScorer::runner_up(&scores, 1) - 0.2).abs() < 1e-12);
        assert_eq!(CorrelationScorer::argmax(&[]), None);
    }
}
