//! Confusion-matrix calibration.
//!
//! During the supervised phase the policy collects (predicted, true)
//! target pairs. The resulting row-stochastic confusion matrix (rows are
//! true targets, columns predicted targets) parameterizes the POMDP
//! observation model, after being regularized by mixing with the uniform
//! distribution.

use serde::{Deserialize, Serialize};

/// Row-stochastic confusion matrix over targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    num_targets: usize,
    rows: Vec<Vec<f64>>,
}

impl ConfusionMatrix {
    /// Build a row-normalized matrix from (predicted, true) pairs.
    ///
    /// A true target that never appeared gets a uniform row: with no
    /// evidence the observation model should not prefer any prediction.
    #[must_use]
    pub fn from_pairs(num_targets: usize, pairs: &[(usize, usize)]) -> Self {
        let mut rows = vec![vec![0.0; num_targets]; num_targets];
        for &(predicted, truth) in pairs {
            if predicted < num_targets && truth < num_targets {
                rows[truth][predicted] += 1.0;
            }
        }
        for row in &mut rows {
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|value| *value /= total);
            } else {
                row.iter_mut()
                    .for_each(|value| *value = 1.0 / num_targets as f64);
            }
        }
        Self { num_targets, rows }
    }

    /// Regularize by mixing with the uniform distribution:
    /// `M' = (1 - norm_value) * M + norm_value / n`.
    #[must_use]
    pub fn regularize(&self, norm_value: f64) -> Self {
        let uniform = norm_value / self.num_targets as f64;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|value| (1.0 - norm_value) * value + uniform)
                    .collect()
            })
            .collect();
        Self {
            num_targets: self.num_targets,
            rows,
        }
    }

    /// Number of targets.
    #[inline]
    #[must_use]
    pub fn num_targets(&self) -> usize {
        self.num_targets
    }

    /// Predicted-target distribution given true target `truth`.
    #[must_use]
    pub fn row(&self, truth: usize) -> &[f64] {
        &self.rows[truth]
    }
}

// ============================================================================
// Tests
// ============================================================================
