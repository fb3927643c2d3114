//! The delivery step: carry the held resource to the first free lane row.

use gemfield_types::Cell;
use tracing::{info, warn};

use crate::agent::{Agent, Errand, StepContext};
use crate::compaction::compact_lane;
use crate::movement::Movement;

impl Agent {
    /// The lowest lane row with no registered resource and no physical
    /// occupant other than this agent, if any.
    pub(crate) fn find_free_row(&self, ctx: &StepContext<'_>) -> Option<Cell> {
        let lane = self.lane(ctx.geometry.depth());
        (0..lane.length)
            .map(|row| lane.cell(row))
            .filter(|cell| ctx.geometry.is_in_bounds(*cell))
            .find(|cell| self.is_row_free(ctx, *cell))
    }

    /// Start carrying the held resource to the first free lane row.
    ///
    /// With no free row the resource goes back on the grid at the current
    /// cell.
    pub(crate) fn begin_delivery(&mut self, ctx: &StepContext<'_>) {
        match self.find_free_row(ctx) {
            Some(slot) => {
                self.errand = Some(Errand::Deliver(Movement::new(
                    slot,
                    ctx.geometry,
                    self.config.reservation_patience,
                )));
            }
            None => {
                warn!(agent = %self.name, column = self.home.x, "Home lane full, resource put back");
                self.return_carried(ctx);
            }
        }
    }

    /// Drop the held resource at the current cell, then compact the lane.
    ///
    /// If the slot was filled while the agent was on its way, the search
    /// starts over from row 0.
    pub(crate) fn finish_delivery(&mut self, ctx: &StepContext<'_>) {
        if !self.is_row_free(ctx, self.cell) {
            self.begin_delivery(ctx);
            return;
        }
        let Some(resource) = self.carried.take() else {
            return;
        };
        let id = resource.id();
        resource.set_delivered(self.cell, ctx.registry);
        self.delivered = self.delivered.saturating_add(1);
        info!(agent = %self.name, resource = %id, cell = %self.cell, delivered = self.delivered, "Resource delivered");
        let _ = compact_lane(ctx.registry, self.lane(ctx.geometry.depth()));
    }

    /// Put the held resource back on the grid at the current cell.
    pub(crate) fn return_carried(&mut self, ctx: &StepContext<'_>) {
        if let Some(resource) = self.carried.take() {
            resource.put_back(self.cell, ctx.registry);
        }
    }

    fn is_row_free(&self, ctx: &StepContext<'_>, cell: Cell) -> bool {
        !ctx.registry.has_resource_at(cell)
            && !ctx
                .probe
                .is_occupied(cell, ctx.geometry.cell_to_position(cell), self.id)
    }
}
