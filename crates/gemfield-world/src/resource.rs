//! The pickable resource entity and its lifecycle.
//!
//! A [`Resource`] is a move-only value. While `Unclaimed` or `Delivered` it
//! lives inside the [`Registry`] at its cell; a successful pick moves it out
//! of the registry and into the carrying agent, and delivery moves it back.
//! Because the type is neither `Clone` nor `Copy`, the registry and an
//! agent can never both hold the same resource.

use gemfield_types::{AgentId, Cell, Color, ResourceId, ResourceSnapshot, ResourceState};
use tracing::debug;

use crate::registry::Registry;

/// Something that can pick resources up: the agent side of a pick.
pub trait Picker {
    /// The picker's identity, used as the reporter on mismatches.
    fn picker_id(&self) -> AgentId;

    /// The color this picker is allowed to carry.
    fn picker_color(&self) -> Color;

    /// Whether the picker has a free carry slot.
    fn can_carry(&self) -> bool;

    /// Take exclusive ownership of a freshly picked resource.
    fn pick_up(&mut self, resource: Resource);
}

/// A colored, pickable item on the grid.
#[derive(Debug, PartialEq, Eq)]
pub struct Resource {
    id: ResourceId,
    color: Color,
    cell: Cell,
    state: ResourceState,
    reported: bool,
}

impl Resource {
    /// Create an `Unclaimed` resource at `cell`. It is not registered yet.
    pub fn new(color: Color, cell: Cell) -> Self {
        Self {
            id: ResourceId::new(),
            color,
            cell,
            state: ResourceState::Unclaimed,
            reported: false,
        }
    }

    /// Resource identifier.
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Resource color. Never changes.
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Cell the resource was last placed at.
    pub const fn cell(&self) -> Cell {
        self.cell
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ResourceState {
        self.state
    }

    /// Whether the one-shot mismatch report has already fired.
    pub const fn reported(&self) -> bool {
        self.reported
    }

    /// Plain-data view of this resource.
    pub const fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            id: self.id,
            color: self.color,
            cell: self.cell,
            state: self.state,
            reported: self.reported,
        }
    }

    /// Attempt to pick the resource `id` registered at `cell` on behalf of
    /// `picker`.
    ///
    /// Fails if the resource is gone or already delivered. On a color
    /// mismatch the resource stays put and, the first time only, its cell is
    /// reported to the owner of its color. On a color match the pick fails
    /// when the picker already carries something; otherwise the resource is
    /// removed from the location index, marked `Carried`, and handed to the
    /// picker.
    pub fn try_pick_by<P: Picker + ?Sized>(
        registry: &Registry,
        id: ResourceId,
        cell: Cell,
        picker: &mut P,
    ) -> bool {
        match registry.claim_for_pick(id, cell, picker.picker_color(), picker.can_carry()) {
            PickClaim::Taken(mut resource) => {
                resource.state = ResourceState::Carried;
                debug!(resource = %resource.id, color = %resource.color, %cell, agent = %picker.picker_id(), "Resource picked");
                picker.pick_up(resource);
                true
            }
            PickClaim::Mismatch {
                color,
                first_report,
            } => {
                if first_report {
                    registry.report_resource(color, cell, picker.picker_id());
                }
                false
            }
            PickClaim::Refused => false,
        }
    }

    /// Mark the resource `Delivered` at `cell` and register it there.
    ///
    /// Calling this again on a re-taken resource simply registers it at the
    /// new cell.
    pub fn set_delivered(mut self, cell: Cell, registry: &Registry) {
        self.state = ResourceState::Delivered;
        self.cell = cell;
        registry.register_resource(self);
    }

    /// Return a carried resource to the grid as `Unclaimed` at `cell`.
    pub fn put_back(mut self, cell: Cell, registry: &Registry) {
        self.state = ResourceState::Unclaimed;
        self.cell = cell;
        registry.register_resource(self);
    }

    /// Move a registered delivered resource to `cell` in place.
    pub(crate) const fn relocate_to(&mut self, cell: Cell) {
        self.cell = cell;
        self.state = ResourceState::Delivered;
    }

    /// Flip the one-shot report flag, returning whether this call flipped it.
    pub(crate) const fn mark_reported(&mut self) -> bool {
        if self.reported {
            return false;
        }
        self.reported = true;
        true
    }
}

/// Outcome of the atomic part of a pick, decided under the registry lock.
#[derive(Debug)]
pub(crate) enum PickClaim {
    /// Color matched and the picker had room; ownership moves to the caller.
    Taken(Resource),
    /// Color mismatch. `first_report` is true on the first mismatch only.
    Mismatch {
        /// The resource's color, used to route the report.
        color: Color,
        /// Whether this attempt flipped the reported flag.
        first_report: bool,
    },
    /// Missing, delivered, or the picker is at capacity.
    Refused,
}
