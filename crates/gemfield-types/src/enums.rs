//! Enumeration types for the Gemfield simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// The color of a resource, and of the single agent that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Color {
    /// Red gems.
    Red,
    /// Green gems.
    Green,
    /// Blue gems.
    Blue,
}

impl Color {
    /// Every color, in declaration order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];
}

impl core::fmt::Display for Color {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Lifecycles
// ---------------------------------------------------------------------------

/// Lifecycle state of a resource.
///
/// `Unclaimed -> Carried -> Delivered`. A delivered resource may still be
/// relocated inside its lane but never becomes carried again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ResourceState {
    /// Lying on the grid, waiting for its owner.
    Unclaimed,
    /// Held by its owning agent.
    Carried,
    /// Placed in the owner's home lane.
    Delivered,
}

/// The plan phase an agent is currently executing.
///
/// Transitions: `Exploring -> HarvestPlanning <-> Harvesting`, then
/// `HarvestPlanning -> Tidying -> Done` once a mailbox drain comes back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AgentPhase {
    /// Optional trip home, then the serpentine sweep of the agent's zone.
    Exploring,
    /// Draining the mailbox and computing a route.
    HarvestPlanning,
    /// Walking a planned route of reported cells.
    Harvesting,
    /// Settle delay followed by bounded lane compaction.
    Tidying,
    /// Terminal. No further actions.
    Done,
}

impl AgentPhase {
    /// Whether this is the terminal phase.
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}
