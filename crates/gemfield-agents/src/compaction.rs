//! Home-lane compaction.
//!
//! A lane is the home column of one agent, indexed by row from 0. After a
//! delivery (and during the tidy pass) the agent pulls its own-color
//! resources toward row 0 so the lane has no gaps. Resources of other
//! colors are left where they are and still count as occupied rows.

use std::collections::BTreeSet;

use gemfield_types::{Cell, Color, ResourceId};
use gemfield_world::Registry;
use tracing::debug;

/// One agent's home column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lane {
    /// Column index of the lane.
    pub column: i32,
    /// Number of rows (the board depth).
    pub length: i32,
    /// The color that is compacted; everything else is ignored.
    pub color: Color,
}

impl Lane {
    /// The cell at `row` in this lane.
    pub const fn cell(&self, row: i32) -> Cell {
        Cell::new(self.column, row)
    }
}

/// Compact `lane`, returning the number of resources moved.
///
/// The lane is scanned once into empty rows and own-color rows, both
/// ascending. Each empty row, lowest first, takes the first own-color
/// resource above it; the row that resource vacates becomes empty in turn.
/// Relative order of own-color resources is preserved.
///
/// Own-color `Unclaimed` resources lying in the lane are moved as well and
/// come out `Delivered`, without ever being carried or counted toward the
/// agent's delivered total. This is intentional: a resource already in its
/// owner's lane needs no trip.
pub fn compact_lane(registry: &Registry, lane: Lane) -> usize {
    let mut empty_rows: BTreeSet<i32> = BTreeSet::new();
    let mut own: Vec<(ResourceId, i32)> = Vec::new();

    for row in 0..lane.length {
        let here = registry.resources_at(lane.cell(row));
        if here.is_empty() {
            empty_rows.insert(row);
            continue;
        }
        own.extend(
            here.iter()
                .filter(|r| r.color == lane.color)
                .map(|r| (r.id, row)),
        );
    }

    let mut moved: usize = 0;
    while let Some(slot) = empty_rows.pop_first() {
        let Some(entry) = own.iter_mut().find(|(_, row)| *row > slot) else {
            continue;
        };
        let (id, from_row) = *entry;
        if !registry.relocate(id, lane.cell(from_row), lane.cell(slot)) {
            // Someone else moved it since the scan; leave it alone.
            continue;
        }
        entry.1 = slot;
        moved = moved.saturating_add(1);
        if !registry.has_resource_at(lane.cell(from_row)) {
            empty_rows.insert(from_row);
        }
    }

    if moved > 0 {
        debug!(column = lane.column, color = %lane.color, moved, "Lane compacted");
    }
    moved
}

/// Whether `lane` has no own-color resource above an empty row.
pub fn is_lane_stable(registry: &Registry, lane: Lane) -> bool {
    let mut found_empty = false;
    for row in 0..lane.length {
        let here = registry.resources_at(lane.cell(row));
        if here.is_empty() {
            found_empty = true;
        } else if found_empty && here.iter().any(|r| r.color == lane.color) {
            return false;
        }
    }
    true
}
