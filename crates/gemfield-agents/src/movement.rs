//! The movement primitive shared by every phase.
//!
//! A move first spins on [`Registry::try_reserve_cell`] until the target is
//! claimed, then interpolates toward the target's world position at a
//! constant speed, turning toward the direction of travel. On arrival the
//! agent's cell becomes the target and the previous cell is released, so an
//! agent holds exactly its current cell, plus its target while in transit.
//!
//! [`Registry::try_reserve_cell`]: gemfield_world::Registry::try_reserve_cell

use std::f64::consts::{PI, TAU};

use gemfield_types::{Cell, Position};
use gemfield_world::GridGeometry;
use tracing::{debug, warn};

use crate::agent::{Agent, StepContext};

/// Below this squared length a direction is too short to turn toward.
const MIN_FACING_LENGTH_SQ: f64 = 1e-6;

/// An in-flight move toward one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Movement {
    /// Destination cell.
    pub(crate) target: Cell,
    /// World centre of the destination cell.
    pub(crate) destination: Position,
    /// Whether the destination reservation is held.
    pub(crate) reserved: bool,
    /// Ticks spent waiting on the reservation so far.
    pub(crate) waited: u32,
    /// Waiting ticks tolerated before the move is abandoned; `None` waits forever.
    pub(crate) patience: Option<u32>,
}

impl Movement {
    pub(crate) fn new(target: Cell, geometry: &dyn GridGeometry, patience: Option<u32>) -> Self {
        Self {
            target,
            destination: geometry.cell_to_position(target),
            reserved: false,
            waited: 0,
            patience,
        }
    }
}

/// What one tick of movement achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveStatus {
    /// Target is held by someone else; retry next tick.
    Waiting,
    /// Interpolating toward the target.
    Travelling,
    /// At the target; the current cell has been updated.
    Arrived,
    /// Target is out of bounds, or waiting ran past the patience limit.
    Aborted,
}

impl Agent {
    /// Advance `movement` by one tick.
    pub(crate) fn advance_movement(
        &mut self,
        movement: &mut Movement,
        ctx: &StepContext<'_>,
    ) -> MoveStatus {
        if !movement.reserved {
            if !ctx.geometry.is_in_bounds(movement.target) {
                warn!(agent = %self.name, target = %movement.target, "Move target out of bounds, skipped");
                return MoveStatus::Aborted;
            }
            if !ctx.registry.try_reserve_cell(movement.target, self.id) {
                movement.waited = movement.waited.saturating_add(1);
                if movement.patience.is_some_and(|limit| movement.waited > limit) {
                    warn!(agent = %self.name, target = %movement.target, waited = movement.waited, "Gave up waiting for cell");
                    return MoveStatus::Aborted;
                }
                return MoveStatus::Waiting;
            }
            movement.reserved = true;
            debug!(agent = %self.name, target = %movement.target, "Cell reserved");
        }

        if self.position.distance_squared(movement.destination) > self.config.arrival_epsilon_sq {
            let max_step = self.config.move_speed * ctx.seconds_per_tick;
            let next = self.position.move_towards(movement.destination, max_step);
            self.face(movement.destination);
            self.position = next;
            return MoveStatus::Travelling;
        }

        let previous = self.cell;
        self.cell = movement.target;
        self.position = movement.destination;
        if previous != movement.target {
            let _ = ctx.registry.release_cell(previous, self.id);
        }
        MoveStatus::Arrived
    }

    /// Blend the heading toward `toward` along the shortest arc.
    fn face(&mut self, toward: Position) {
        let dx = toward.x - self.position.x;
        let dz = toward.z - self.position.z;
        if dx.mul_add(dx, dz * dz) <= MIN_FACING_LENGTH_SQ {
            return;
        }
        let desired = dx.atan2(dz);
        let delta = wrap_angle(desired - self.heading);
        self.heading = wrap_angle(delta.mul_add(self.config.turn_blend, self.heading));
    }
}

/// Normalise an angle into `[-PI, PI)`.
fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
