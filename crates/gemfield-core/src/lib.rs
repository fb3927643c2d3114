//! Configuration, clock, tick cycle, and run loop for the Gemfield simulation.
//!
//! This crate drives the agents: every scheduler tick advances the clock
//! and steps each unfinished agent once, in a fixed order, against the
//! shared registry.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and simulated tick length.
//! - [`config`] -- Configuration loading from `gemfield-config.yaml` into
//!   strongly-typed structs.
//! - [`operator`] -- Shared run control (stop flag and run bounds) and end
//!   reasons.
//! - [`runner`] -- The async run loop with end conditions and callbacks.
//! - [`tick`] -- Simulation state and the single-tick cycle.

pub mod clock;
pub mod config;
pub mod operator;
pub mod runner;
pub mod tick;
