//! Collector agents for the Gemfield simulation.
//!
//! This crate is the behaviour layer: each [`Agent`] is an explicit state
//! machine advanced once per scheduler tick through [`Agent::step`]. It
//! sits on top of `gemfield-world` (shared board and registry) and is
//! driven by the tick cycle in `gemfield-core`.
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] state machine and its per-step context.
//! - [`compaction`] -- Home-lane compaction and the stability check.
//! - [`config`] -- Movement and tidy-pass tuning ([`AgentConfig`]).
//! - [`error`] -- Error types for building agents ([`AgentError`]).
//! - [`routing`] -- Greedy nearest-neighbour route ordering.

pub mod agent;
pub mod compaction;
pub mod config;
mod delivery;
pub mod error;
mod movement;
mod pickup;
pub mod routing;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentSpec, StepContext};
pub use compaction::{Lane, compact_lane, is_lane_stable};
pub use config::AgentConfig;
pub use error::AgentError;
pub use routing::greedy_route;
