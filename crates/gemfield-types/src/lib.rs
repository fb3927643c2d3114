//! Shared type definitions for the Gemfield simulation.
//!
//! This crate is the single source of truth for the value types used across
//! the workspace. Types flow to `TypeScript` via `ts-rs` so a display
//! collaborator can render board and agent snapshots.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents and resources
//! - [`enums`] -- Colors, resource lifecycle states, agent phases
//! - [`structs`] -- Grid cells, positions, zones, reports, snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentPhase, Color, ResourceState};
pub use ids::{AgentId, ResourceId};
pub use structs::{
    AgentSnapshot, BoardSnapshot, Cell, Position, Report, ResourceSnapshot, Zone,
};

#[cfg(test)]
mod tests {
    //! Binding generation for the display collaborator.

    #[test]
    fn export_bindings() {
        // Importing the trait and calling export_all writes the `.ts` files
        // under `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::ResourceId::export_all();

        // Enums
        let _ = crate::enums::Color::export_all();
        let _ = crate::enums::ResourceState::export_all();
        let _ = crate::enums::AgentPhase::export_all();

        // Structs
        let _ = crate::structs::Cell::export_all();
        let _ = crate::structs::Position::export_all();
        let _ = crate::structs::Zone::export_all();
        let _ = crate::structs::Report::export_all();
        let _ = crate::structs::AgentSnapshot::export_all();
        let _ = crate::structs::ResourceSnapshot::export_all();
        let _ = crate::structs::BoardSnapshot::export_all();
    }
}
