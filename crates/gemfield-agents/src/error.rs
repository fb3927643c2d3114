//! Error types for the gemfield-agents crate.
//!
//! Coordination itself never fails: contention is a retry, a bad target is
//! a skipped move. Errors are limited to rejecting unusable configuration
//! or placement when an agent is built.

use gemfield_types::Zone;

/// Errors that can occur while constructing an agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A configuration value is out of range.
    #[error("invalid agent configuration: {reason}")]
    InvalidConfig {
        /// Description of the rejected value.
        reason: String,
    },

    /// The sweep zone is empty or reaches outside the grid.
    #[error("invalid sweep zone {zone:?}")]
    InvalidZone {
        /// The rejected zone.
        zone: Zone,
    },
}
