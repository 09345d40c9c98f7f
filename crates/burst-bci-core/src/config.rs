//! Configuration types with range validation.
//!
//! Every constructor that accepts one of these structs calls `validate()`
//! first: out-of-range values are rejected with a descriptive error, never
//! silently clamped or replaced. Defaults live on the `Default` impls;
//! loading and overriding them is the job of the surrounding runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Buffering, episode, and refractory parameters shared by every policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccumulationConfig {
    /// Minimum buffered samples before any decision is attempted
    pub min_buffer_size: usize,
    /// Hard capacity of the evidence buffer
    pub max_buffer_size: usize,
    /// Minimum frames of agreement before a policy may emit
    pub min_frames_pred: u32,
    /// Frame budget after which a forced decision is taken
    pub max_frames_pred: u32,
    /// Refractory window after a prediction, in milliseconds
    pub recovery_ms: f64,
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            min_buffer_size: 30,
            max_buffer_size: 200,
            min_frames_pred: 30,
            max_frames_pred: 300,
            recovery_ms: 300.0,
        }
    }
}

impl AccumulationConfig {
    /// Check all range constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_buffer_size < 2 {
            return Err(ConfigError::OutOfRange {
                parameter: "min_buffer_size",
                value: self.min_buffer_size as f64,
                constraint: "min_buffer_size >= 2",
            });
        }
        if self.max_buffer_size < self.min_buffer_size {
            return Err(ConfigError::Inconsistent {
                reason: "max_buffer_size must be >= min_buffer_size",
            });
        }
        if self.min_frames_pred == 0 {
            return Err(ConfigError::OutOfRange {
                parameter: "min_frames_pred",
                value: 0.0,
                constraint: "min_frames_pred >= 1",
            });
        }
        if self.max_frames_pred < self.min_frames_pred {
            return Err(ConfigError::Inconsistent {
                reason: "max_frames_pred must be >= min_frames_pred",
            });
        }
        if !(self.recovery_ms > 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "recovery_ms",
                value: self.recovery_ms,
                constraint: "recovery_ms > 0",
            });
        }
        Ok(())
    }
}

/// Quality gates for the streak-based policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SteadyConfig {
    /// Minimum winner correlation for a streak to continue
    pub correlation_threshold: f64,
    /// Minimum winner margin over the runner-up for a streak to continue
    pub margin_threshold: f64,
}

impl Default for SteadyConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: 0.0,
            margin_threshold: 0.0,
        }
    }
}

impl SteadyConfig {
    /// Check all range constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(-1.0..=1.0).contains(&self.correlation_threshold) {
            return Err(ConfigError::OutOfRange {
                parameter: "correlation_threshold",
                value: self.correlation_threshold,
                constraint: "-1 <= correlation_threshold <= 1",
            });
        }
        if !(self.margin_threshold >= 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "margin_threshold",
                value: self.margin_threshold,
                constraint: "margin_threshold >= 0",
            });
        }
        Ok(())
    }
}

/// Parameters of the momentum-based policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Momentum value a target must exceed before emission
    pub momentum_threshold: f64,
    /// Minimum winner correlation for momentum to grow
    pub correlation_threshold: f64,
    /// Momentum never decays below this floor
    pub momentum_floor: f64,
    /// Normalized-advantage margin below which a decision is ambiguous
    pub tooclose_threshold: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            momentum_threshold: 1.0,
            correlation_threshold: 0.0,
            momentum_floor: 0.0,
            tooclose_threshold: 0.05,
        }
    }
}

impl MomentumConfig {
    /// Check all range constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.momentum_threshold > 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "momentum_threshold",
                value: self.momentum_threshold,
                constraint: "momentum_threshold > 0",
            });
        }
        if !(-1.0..=1.0).contains(&self.correlation_threshold) {
            return Err(ConfigError::OutOfRange {
                parameter: "correlation_threshold",
                value: self.correlation_threshold,
                constraint: "-1 <= correlation_threshold <= 1",
            });
        }
        if !(self.momentum_floor >= 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "momentum_floor",
                value: self.momentum_floor,
                constraint: "momentum_floor >= 0",
            });
        }
        if !(self.tooclose_threshold > 0.0 && self.tooclose_threshold < 1.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "tooclose_threshold",
                value: self.tooclose_threshold,
                constraint: "0 < tooclose_threshold < 1",
            });
        }
        Ok(())
    }
}

/// Parameters of the POMDP policy and its external solver budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PomdpConfig {
    /// Frames between POMDP observations (the belief-update cadence)
    pub pomdp_step: u32,
    /// Mixing factor for confusion-matrix regularization, in (0, 1)
    pub norm_value: f64,
    /// Reward for a correct decide action
    pub hit_reward: f64,
    /// Reward (negative) for an incorrect decide action
    pub miss_cost: f64,
    /// Reward (small negative) for waiting one step
    pub wait_cost: f64,
    /// Discount factor, in (0, 1); forced to 0.9999 in finite-horizon mode
    pub discount_factor: f64,
    /// Solver time budget in seconds
    pub timeout_s: u32,
    /// Solver memory budget in megabytes
    pub memory_mb: u32,
    /// Solver target precision, in (0, 1)
    pub precision: f64,
    /// Path to the external SARSOP solver executable
    pub solver_path: PathBuf,
    /// Cross target states with a bounded step counter and a terminal state
    pub finite_horizon: bool,
}

impl Default for PomdpConfig {
    fn default() -> Self {
        Self {
            pomdp_step: 6,
            norm_value: 0.3,
            hit_reward: 10.0,
            miss_cost: -100.0,
            wait_cost: -1.0,
            discount_factor: 0.8,
            timeout_s: 30,
            memory_mb: 4096,
            precision: 0.001,
            solver_path: PathBuf::new(),
            finite_horizon: false,
        }
    }
}

impl PomdpConfig {
    /// Check all range constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pomdp_step == 0 {
            return Err(ConfigError::OutOfRange {
                parameter: "pomdp_step",
                value: 0.0,
                constraint: "pomdp_step >= 1",
            });
        }
        if !(self.norm_value > 0.0 && self.norm_value < 1.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "norm_value",
                value: self.norm_value,
                constraint: "0 < norm_value < 1",
            });
        }
        if !(self.hit_reward > 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "hit_reward",
                value: self.hit_reward,
                constraint: "hit_reward > 0",
            });
        }
        if !(self.miss_cost < 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "miss_cost",
                value: self.miss_cost,
                constraint: "miss_cost < 0",
            });
        }
        if !(self.wait_cost < 0.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "wait_cost",
                value: self.wait_cost,
                constraint: "wait_cost < 0",
            });
        }
        if !(self.discount_factor > 0.0 && self.discount_factor < 1.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "discount_factor",
                value: self.discount_factor,
                constraint: "0 < discount_factor < 1",
            });
        }
        if self.timeout_s == 0 {
            return Err(ConfigError::OutOfRange {
                parameter: "timeout_s",
                value: 0.0,
                constraint: "timeout_s > 0",
            });
        }
        if self.memory_mb == 0 {
            return Err(ConfigError::OutOfRange {
                parameter: "memory_mb",
                value: 0.0,
                constraint: "memory_mb > 0",
            });
        }
        if !(self.precision > 0.0 && self.precision < 1.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "precision",
                value: self.precision,
                constraint: "0 < precision < 1",
            });
        }
        if self.solver_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath {
                parameter: "solver_path",
            });
        }
        Ok(())
    }

    /// Effective discount factor: a finite-horizon problem is solved as an
    /// effectively undiscounted one.
    #[must_use]
    pub fn effective_discount(&self) -> f64 {
        if self.finite_horizon {
            0.9999
        } else {
            self.discount_factor
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
