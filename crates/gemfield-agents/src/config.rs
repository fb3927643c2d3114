//! Tunable parameters for agent movement and the tidy pass.
//!
//! The engine builds an [`AgentConfig`] from the `agents` section of
//! `gemfield-config.yaml`; tests construct it directly.

use crate::error::AgentError;

/// Movement and tidy-pass tuning shared by every agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// World units travelled per simulated second (default: 2.0).
    pub move_speed: f64,

    /// Squared distance below which an agent counts as arrived (default: 0.0004).
    pub arrival_epsilon_sq: f64,

    /// Fraction of the remaining turn applied per tick (default: 0.5).
    pub turn_blend: f64,

    /// Ticks to wait before the tidy pass starts (default: 200).
    pub tidy_settle_ticks: u32,

    /// Maximum compaction attempts in the tidy pass (default: 4).
    pub tidy_max_attempts: u32,

    /// Ticks an agent waits on a contended cell before skipping a sweep or
    /// harvest target, or rescanning the lane for a delivery (default: 100).
    /// `None` waits indefinitely.
    pub reservation_patience: Option<u32>,

    /// Times a cell whose visit was abandoned is queued again before the
    /// agent gives up on it (default: 3).
    pub visit_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            move_speed: 2.0,
            arrival_epsilon_sq: 0.0004,
            turn_blend: 0.5,
            tidy_settle_ticks: 200,
            tidy_max_attempts: 4,
            reservation_patience: Some(100),
            visit_retries: 3,
        }
    }
}

impl AgentConfig {
    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] for a non-positive speed or
    /// epsilon, or a turn blend outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !self.move_speed.is_finite() || self.move_speed <= 0.0 {
            return Err(AgentError::InvalidConfig {
                reason: format!("move_speed must be positive, got {}", self.move_speed),
            });
        }
        if !self.arrival_epsilon_sq.is_finite() || self.arrival_epsilon_sq <= 0.0 {
            return Err(AgentError::InvalidConfig {
                reason: format!(
                    "arrival_epsilon_sq must be positive, got {}",
                    self.arrival_epsilon_sq
                ),
            });
        }
        if !(self.turn_blend > 0.0 && self.turn_blend <= 1.0) {
            return Err(AgentError::InvalidConfig {
                reason: format!("turn_blend must be in (0, 1], got {}", self.turn_blend),
            });
        }
        Ok(())
    }
}
