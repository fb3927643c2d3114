//! Physical occupancy probe.
//!
//! Delivery double-checks a lane slot against a view of the world that is
//! independent of the resource index. The engine uses the [`Registry`]'s
//! reservation map: a cell held by another agent has someone standing on
//! it (or about to), so nothing can be placed there. An embedding with a
//! physics layer can supply a collider overlap test instead.

use gemfield_types::{AgentId, Cell, Position};

use crate::registry::Registry;

/// Independent "is something physically here?" check.
pub trait OccupancyProbe: Send + Sync {
    /// Whether something other than `asker` is physically present at
    /// `cell` / `position`.
    fn is_occupied(&self, cell: Cell, position: Position, asker: AgentId) -> bool;
}

impl OccupancyProbe for Registry {
    fn is_occupied(&self, cell: Cell, _position: Position, asker: AgentId) -> bool {
        self.reservation_holder(cell)
            .is_some_and(|holder| holder != asker)
    }
}
