//! Core value types and read-only snapshots for the Gemfield simulation.
//!
//! [`Cell`] is the identity type used as a key by every registry map.
//! The snapshot structs are what a display or debugging collaborator sees;
//! they are plain data and never alias live agent state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentPhase, Color, ResourceState};
use crate::ids::{AgentId, ResourceId};

// ---------------------------------------------------------------------------
// Grid coordinates
// ---------------------------------------------------------------------------

/// An integer grid coordinate `(x, z)`.
///
/// Ordering is `x` first, then `z`. Bounds are not enforced here; that is
/// the job of the grid geometry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Cell {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub z: i32,
}

impl Cell {
    /// Construct a cell from its column and row.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Manhattan distance between two cells.
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.z.abs_diff(other.z))
    }
}

impl core::fmt::Display for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A world-space position on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// World X coordinate.
    pub x: f64,
    /// World Z coordinate.
    pub z: f64,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx.mul_add(dx, dz * dz)
    }

    /// Step toward `target` by at most `max_step` units, never overshooting.
    pub fn move_towards(self, target: Self, max_step: f64) -> Self {
        let dx = target.x - self.x;
        let dz = target.z - self.z;
        let distance = dx.hypot(dz);
        if distance <= max_step || distance <= f64::EPSILON {
            return target;
        }
        let ratio = max_step / distance;
        Self {
            x: dx.mul_add(ratio, self.x),
            z: dz.mul_add(ratio, self.z),
        }
    }
}

/// An inclusive rectangular range of cells assigned to an agent's sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Zone {
    /// Smallest column, inclusive.
    pub min_x: i32,
    /// Largest column, inclusive.
    pub max_x: i32,
    /// Smallest row, inclusive.
    pub min_z: i32,
    /// Largest row, inclusive.
    pub max_z: i32,
}

impl Zone {
    /// Construct a zone from inclusive bounds.
    pub const fn new(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Whether the zone contains no cells.
    pub const fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_z > self.max_z
    }

    /// Whether `cell` lies inside the zone.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.z >= self.min_z && cell.z <= self.max_z
    }

    /// Boustrophedon visiting order: row by row from `min_z`, alternating
    /// left-to-right and right-to-left, so consecutive cells are adjacent.
    pub fn serpentine(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        let mut forward = true;
        for z in self.min_z..=self.max_z {
            if forward {
                cells.extend((self.min_x..=self.max_x).map(|x| Cell::new(x, z)));
            } else {
                cells.extend((self.min_x..=self.max_x).rev().map(|x| Cell::new(x, z)));
            }
            forward = !forward;
        }
        cells
    }
}

// ---------------------------------------------------------------------------
// Mailbox payload
// ---------------------------------------------------------------------------

/// A one-way report that a cell holds a resource of the recipient's color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Report {
    /// Where the resource was seen.
    pub cell: Cell,
    /// The agent that saw it.
    pub reported_by: AgentId,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only view of one agent for display and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Agent identifier.
    pub id: AgentId,
    /// Short display name (`A1`, `A2`, ...).
    pub name: String,
    /// Owned color.
    pub color: Color,
    /// Current plan phase.
    pub phase: AgentPhase,
    /// Last successfully reserved cell.
    pub cell: Cell,
    /// Interpolated world position.
    pub position: Position,
    /// Lane origin.
    pub home: Cell,
    /// Planned harvest route (empty outside `Harvesting`).
    pub route: Vec<Cell>,
    /// The resource currently carried, if any.
    pub carrying: Option<ResourceId>,
    /// Number of resources delivered so far.
    pub delivered: u32,
}

/// Read-only view of one registered (non-carried) resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceSnapshot {
    /// Resource identifier.
    pub id: ResourceId,
    /// Resource color.
    pub color: Color,
    /// Cell the resource is registered at.
    pub cell: Cell,
    /// Lifecycle state (`Unclaimed` or `Delivered`).
    pub state: ResourceState,
    /// Whether the one-shot report to the owner has fired.
    pub reported: bool,
}

/// Read-only view of the shared board state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BoardSnapshot {
    /// Tick the snapshot was taken at.
    pub tick: u64,
    /// Registered resources, ordered by cell.
    pub resources: Vec<ResourceSnapshot>,
    /// Current cell reservations.
    pub reservations: BTreeMap<String, AgentId>,
    /// Owning agent per color.
    pub owners: BTreeMap<Color, AgentId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = Cell::new(1, 4);
        let b = Cell::new(3, 1);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(b.manhattan(a), 5);
        assert_eq!(a.manhattan(a), 0);
    }

    #[test]
    fn cells_order_by_column_then_row() {
        assert!(Cell::new(0, 9) < Cell::new(1, 0));
        assert!(Cell::new(2, 1) < Cell::new(2, 3));
    }

    #[test]
    fn serpentine_alternates_direction() {
        let zone = Zone::new(0, 1, 0, 2);
        let cells = zone.serpentine();
        assert_eq!(
            cells,
            vec![
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(1, 1),
                Cell::new(0, 1),
                Cell::new(0, 2),
                Cell::new(1, 2),
            ]
        );
    }

    #[test]
    fn serpentine_steps_are_adjacent() {
        let cells = Zone::new(2, 4, 0, 3).serpentine();
        assert_eq!(cells.len(), 12);
        for pair in cells.windows(2) {
            if let [a, b] = pair {
                assert_eq!(a.manhattan(*b), 1, "{a} -> {b}");
            }
        }
    }

    #[test]
    fn empty_zone_yields_nothing() {
        let zone = Zone::new(3, 2, 0, 4);
        assert!(zone.is_empty());
        assert!(zone.serpentine().is_empty());
    }

    #[test]
    fn zone_contains_bounds_inclusive() {
        let zone = Zone::new(0, 1, 0, 4);
        assert!(zone.contains(Cell::new(1, 4)));
        assert!(!zone.contains(Cell::new(2, 0)));
    }

    #[test]
    fn move_towards_never_overshoots() {
        let start = Position::new(0.0, 0.0);
        let end = Position::new(1.0, 0.0);
        let step = start.move_towards(end, 0.25);
        assert!((step.x - 0.25).abs() < 1e-9);
        let arrived = step.move_towards(end, 5.0);
        assert!(arrived.distance_squared(end) < 1e-12);
    }

    #[test]
    fn snapshot_roundtrip_serde() {
        let snap = ResourceSnapshot {
            id: ResourceId::new(),
            color: Color::Blue,
            cell: Cell::new(2, 3),
            state: ResourceState::Unclaimed,
            reported: true,
        };
        let json = serde_json::to_string(&snap).unwrap_or_default();
        let restored: Result<ResourceSnapshot, _> = serde_json::from_str(&json);
        assert_eq!(restored.ok(), Some(snap));
    }
}
