//! The shared coordination registry.
//!
//! Three independent maps, each behind its own mutex:
//!
//! 1. **owner-by-color** -- which agent owns a color, plus that agent's
//!    mailbox sender.
//! 2. **resources-by-cell** -- the non-carried resources present at a cell.
//! 3. **agent-by-cell** -- which agent currently holds a cell reservation.
//!
//! Every public operation is a single critical section on one map, so no
//! lock is ever held across an agent's yield point and no two locks are
//! ever held at once. All operations are total: contention shows up as
//! `false` or a no-op, never as an error.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gemfield_types::{
    AgentId, BoardSnapshot, Cell, Color, Report, ResourceId, ResourceSnapshot, ResourceState,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::resource::{PickClaim, Resource};

/// Sending half of an agent's mailbox.
pub type MailboxSender = UnboundedSender<Report>;

/// Registry entry for a color owner.
#[derive(Debug, Clone)]
struct OwnerEntry {
    agent: AgentId,
    mailbox: MailboxSender,
}

/// Process-wide coordination state shared by every agent.
///
/// Construct one per simulation and lend it to every agent by reference.
#[derive(Debug, Default)]
pub struct Registry {
    owners: Mutex<BTreeMap<Color, OwnerEntry>>,
    resources_by_cell: Mutex<BTreeMap<Cell, BTreeMap<ResourceId, Resource>>>,
    agent_by_cell: Mutex<BTreeMap<Cell, AgentId>>,
}

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every critical section leaves its map consistent, so a poisoned lock
/// still guards valid data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Ownership routing
    // -------------------------------------------------------------------

    /// Record `agent` as the owner of `color`. The last writer wins.
    pub fn register_owner(&self, color: Color, agent: AgentId, mailbox: MailboxSender) {
        lock(&self.owners).insert(color, OwnerEntry { agent, mailbox });
        debug!(%color, %agent, "Owner registered");
    }

    /// The agent that owns `color`, if any.
    pub fn get_owner(&self, color: Color) -> Option<AgentId> {
        lock(&self.owners).get(&color).map(|entry| entry.agent)
    }

    /// Forward a sighting of a `color` resource at `cell` to its owner.
    ///
    /// No-op when the color has no owner or the owner is the reporter.
    /// Returns whether a report was enqueued.
    pub fn report_resource(&self, color: Color, cell: Cell, reporter: AgentId) -> bool {
        let Some(entry) = lock(&self.owners).get(&color).cloned() else {
            return false;
        };
        if entry.agent == reporter {
            return false;
        }
        let sent = entry
            .mailbox
            .send(Report {
                cell,
                reported_by: reporter,
            })
            .is_ok();
        debug!(%color, %cell, %reporter, owner = %entry.agent, sent, "Resource reported to owner");
        sent
    }

    // -------------------------------------------------------------------
    // Resource location index
    // -------------------------------------------------------------------

    /// Register `resource` at its current cell.
    pub fn register_resource(&self, resource: Resource) {
        let cell = resource.cell();
        lock(&self.resources_by_cell)
            .entry(cell)
            .or_default()
            .entry(resource.id())
            .or_insert(resource);
    }

    /// Remove resource `id` from `cell`, pruning the cell if it empties.
    ///
    /// Returns the removed resource, or `None` if it was not there.
    pub fn unregister_resource(&self, id: ResourceId, cell: Cell) -> Option<Resource> {
        let mut map = lock(&self.resources_by_cell);
        take_at(&mut map, id, cell)
    }

    /// Snapshot of the resources registered at `cell` (empty if none).
    pub fn resources_at(&self, cell: Cell) -> Vec<ResourceSnapshot> {
        lock(&self.resources_by_cell)
            .get(&cell)
            .map(|here| here.values().map(Resource::snapshot).collect())
            .unwrap_or_default()
    }

    /// Whether any resource is registered at `cell`.
    pub fn has_resource_at(&self, cell: Cell) -> bool {
        lock(&self.resources_by_cell)
            .get(&cell)
            .is_some_and(|here| !here.is_empty())
    }

    /// Snapshot of every registered resource, ordered by cell.
    pub fn resources(&self) -> Vec<ResourceSnapshot> {
        lock(&self.resources_by_cell)
            .values()
            .flat_map(|here| here.values().map(Resource::snapshot))
            .collect()
    }

    /// Move the delivered resource `id` from `from` to `to`.
    ///
    /// Returns `false` (and changes nothing) if it is not registered at
    /// `from`.
    pub fn relocate(&self, id: ResourceId, from: Cell, to: Cell) -> bool {
        let mut map = lock(&self.resources_by_cell);
        let Some(mut resource) = take_at(&mut map, id, from) else {
            return false;
        };
        resource.relocate_to(to);
        map.entry(to).or_default().insert(id, resource);
        debug!(resource = %id, %from, %to, "Resource relocated");
        true
    }

    /// Decide the atomic part of a pick under the location-index lock.
    pub(crate) fn claim_for_pick(
        &self,
        id: ResourceId,
        cell: Cell,
        picker_color: Color,
        picker_has_room: bool,
    ) -> PickClaim {
        let mut map = lock(&self.resources_by_cell);
        let Some(resource) = map.get_mut(&cell).and_then(|here| here.get_mut(&id)) else {
            return PickClaim::Refused;
        };
        if resource.state() == ResourceState::Delivered {
            return PickClaim::Refused;
        }
        if resource.color() != picker_color {
            return PickClaim::Mismatch {
                color: resource.color(),
                first_report: resource.mark_reported(),
            };
        }
        if !picker_has_room {
            return PickClaim::Refused;
        }
        take_at(&mut map, id, cell).map_or(PickClaim::Refused, PickClaim::Taken)
    }

    // -------------------------------------------------------------------
    // Cell reservations
    // -------------------------------------------------------------------

    /// Atomically claim `cell` for `agent`.
    ///
    /// Succeeds if the cell is free or already held by `agent`; fails
    /// without side effects if another agent holds it.
    pub fn try_reserve_cell(&self, cell: Cell, agent: AgentId) -> bool {
        let mut reservations = lock(&self.agent_by_cell);
        match reservations.get(&cell) {
            Some(holder) if *holder != agent => {
                trace!(%cell, %agent, holder = %holder, "Reservation contended");
                false
            }
            Some(_) => true,
            None => {
                reservations.insert(cell, agent);
                true
            }
        }
    }

    /// Release `cell` if and only if `agent` holds it.
    ///
    /// Returns whether a reservation was cleared.
    pub fn release_cell(&self, cell: Cell, agent: AgentId) -> bool {
        let mut reservations = lock(&self.agent_by_cell);
        if reservations.get(&cell) == Some(&agent) {
            reservations.remove(&cell);
            return true;
        }
        false
    }

    /// The agent currently holding `cell`, if any.
    pub fn reservation_holder(&self, cell: Cell) -> Option<AgentId> {
        lock(&self.agent_by_cell).get(&cell).copied()
    }

    /// Copy of every current reservation.
    pub fn reserved_cells(&self) -> BTreeMap<Cell, AgentId> {
        lock(&self.agent_by_cell).clone()
    }

    // -------------------------------------------------------------------
    // Display
    // -------------------------------------------------------------------

    /// Read-only view of the whole board at `tick`.
    pub fn snapshot(&self, tick: u64) -> BoardSnapshot {
        let owners = lock(&self.owners)
            .iter()
            .map(|(color, entry)| (*color, entry.agent))
            .collect();
        let reservations = self
            .reserved_cells()
            .into_iter()
            .map(|(cell, agent)| (cell.to_string(), agent))
            .collect();
        BoardSnapshot {
            tick,
            resources: self.resources(),
            reservations,
            owners,
        }
    }
}

/// Remove `id` from `cell` inside an already-locked map, pruning empties.
fn take_at(
    map: &mut BTreeMap<Cell, BTreeMap<ResourceId, Resource>>,
    id: ResourceId,
    cell: Cell,
) -> Option<Resource> {
    let here = map.get_mut(&cell)?;
    let taken = here.remove(&id);
    if here.is_empty() {
        map.remove(&cell);
    }
    taken
}
