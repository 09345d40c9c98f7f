//! External SARSOP solver bridge.
//!
//! The point-based solver is a separate executable (APPL `pomdpsol`). The
//! bridge writes the problem in Cassandra format, runs the solver with its
//! time, memory, and precision budgets, and parses the alpha-vector policy
//! it writes back. The solver enforces its own timeout, so the invocation
//! is a plain blocking child process.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::model::{PomdpAction, PomdpModel};
use crate::error::SolverError;

/// One alpha vector of a solved policy.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaVector {
    /// Action this vector argues for
    pub action: PomdpAction,
    /// Value per hidden state
    pub values: Vec<f64>,
}

/// A solved piecewise-linear value function.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaVectorPolicy {
    vectors: Vec<AlphaVector>,
}

impl AlphaVectorPolicy {
    /// Best action for a belief: the action of the maximizing alpha vector.
    #[must_use]
    pub fn plan(&self, belief: &[f64]) -> PomdpAction {
        self.vectors
            .iter()
            .map(|vector| {
                let value: f64 = vector
                    .values
                    .iter()
                    .zip(belief)
                    .map(|(alpha, b)| alpha * b)
                    .sum();
                (vector.action, value)
            })
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(action, _)| action)
            .unwrap_or(PomdpAction::Wait)
    }

    /// Parse the solver's policy XML.
    ///
    /// Only the `<Vector action="..">values</Vector>` entries matter; the
    /// surrounding document structure is not validated beyond that.
    pub fn parse(text: &str, num_states: usize) -> Result<Self, SolverError> {
        let mut vectors = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find("<Vector") {
            rest = &rest[start..];
            let tag_end = rest.find('>').ok_or(SolverError::PolicyParse {
                reason: "unterminated <Vector> tag".to_owned(),
            })?;
            let tag = &rest[..tag_end];
            let action_index = Self::attribute(tag, "action")?;
            let body_end = rest.find("</Vector>").ok_or(SolverError::PolicyParse {
                reason: "missing </Vector>".to_owned(),
            })?;
            let body = &rest[tag_end + 1..body_end];
            let values = body
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|error| SolverError::PolicyParse {
                    reason: format!("bad alpha value: {error}"),
                })?;
            if values.len() != num_states {
                return Err(SolverError::PolicyParse {
                    reason: format!(
                        "alpha vector has {} values, expected {num_states}",
                        values.len()
                    ),
                });
            }
            vectors.push(AlphaVector {
                action: PomdpAction::from_index(action_index),
                values,
            });
            rest = &rest[body_end..];
        }
        if vectors.is_empty() {
            return Err(SolverError::PolicyParse {
                reason: "no alpha vectors found".to_owned(),
            });
        }
        Ok(Self { vectors })
    }

    fn attribute(tag: &str, name: &str) -> Result<usize, SolverError> {
        let marker = format!("{name}=\"");
        let start = tag.find(&marker).ok_or_else(|| SolverError::PolicyParse {
            reason: format!("missing {name} attribute on <Vector>"),
        })? + marker.len();
        let end = tag[start..].find('"').ok_or_else(|| SolverError::PolicyParse {
            reason: format!("unterminated {name} attribute"),
        })? + start;
        tag[start..end]
            .parse()
            .map_err(|error| SolverError::PolicyParse {
                reason: format!("bad {name} attribute: {error}"),
            })
    }
}

/// Budgets and location of the external solver.
#[derive(Clone, Debug)]
pub struct SarsopSolver {
    path: PathBuf,
    timeout_s: u32,
    memory_mb: u32,
    precision: f64,
}

impl SarsopSolver {
    /// Configure the solver invocation.
    #[must_use]
    pub fn new(path: PathBuf, timeout_s: u32, memory_mb: u32, precision: f64) -> Self {
        Self {
            path,
            timeout_s,
            memory_mb,
            precision,
        }
    }

    /// Solve a model: write the problem file, run the solver, parse the
    /// policy. Temporary files are removed afterwards either way.
    pub fn solve(
        &self,
        model: &PomdpModel,
        discount: f64,
    ) -> Result<AlphaVectorPolicy, SolverError> {
        let stem = format!(
            "burst-bci-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or(0)
        );
        let problem_path = std::env::temp_dir().join(format!("{stem}.pomdp"));
        let policy_path = std::env::temp_dir().join(format!("{stem}.policy"));

        std::fs::write(&problem_path, model.to_pomdp_format(discount))?;
        let result = self.run(model, &problem_path, &policy_path);

        if let Err(error) = std::fs::remove_file(&problem_path) {
            warn!(path = %problem_path.display(), %error, "failed to remove problem file");
        }
        if policy_path.exists() {
            if let Err(error) = std::fs::remove_file(&policy_path) {
                warn!(path = %policy_path.display(), %error, "failed to remove policy file");
            }
        }
        result
    }

    fn run(
        &self,
        model: &PomdpModel,
        problem_path: &Path,
        policy_path: &Path,
    ) -> Result<AlphaVectorPolicy, SolverError> {
        debug!(
            solver = %self.path.display(),
            timeout_s = self.timeout_s,
            memory_mb = self.memory_mb,
            precision = self.precision,
            "launching solver"
        );
        let output = Command::new(&self.path)
            .arg("--timeout")
            .arg(self.timeout_s.to_string())
            .arg("--memory-limit")
            .arg(self.memory_mb.to_string())
            .arg("--precision")
            .arg(self.precision.to_string())
            .arg("--output")
            .arg(policy_path)
            .arg(problem_path)
            .output()
            .map_err(|source| SolverError::Launch {
                path: self.path.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        let text = std::fs::read_to_string(policy_path).map_err(|_| SolverError::PolicyMissing {
            path: policy_path.display().to_string(),
        })?;
        AlphaVectorPolicy::parse(&text, model.num_states())
    }
}

// ============================================================================
// Tests
// ============================================================================
