//! Grid geometry, resources, and coordination state for the Gemfield simulation.
//!
//! This crate models everything agents share: the board they walk on, the
//! resources lying on it, and the [`Registry`] through which agents find
//! owners, locate resources, and reserve cells.
//!
//! # Modules
//!
//! - [`board`] -- [`GridGeometry`] trait and the rectangular [`Board`].
//! - [`error`] -- Error types for building world state.
//! - [`occupancy`] -- Physical-occupancy probe, backed by reservations.
//! - [`registry`] -- Owner routing, resource location index, reservations.
//! - [`resource`] -- The move-only [`Resource`] entity and the pick protocol.

pub mod board;
pub mod error;
pub mod occupancy;
pub mod registry;
pub mod resource;

// Re-export primary types at crate root.
pub use board::{Board, GridGeometry};
pub use error::WorldError;
pub use occupancy::OccupancyProbe;
pub use registry::{MailboxSender, Registry};
pub use resource::{Picker, Resource};
