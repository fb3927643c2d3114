//! The pick-up step run at every visited cell.

use gemfield_types::ResourceState;
use gemfield_world::Resource;
use tracing::debug;

use crate::agent::{Agent, StepContext};

impl Agent {
    /// Attempt to pick every resource at the current cell.
    ///
    /// Every resource present is attempted even once the agent is carrying,
    /// so mismatched colors are still reported. Own-color resources that
    /// cannot be taken for lack of room are queued in the agent's own
    /// mailbox so the harvest loop returns for them, but only while the
    /// lane still has a free row to put them in.
    pub(crate) fn pick_up_here(&mut self, ctx: &StepContext<'_>) {
        let cell = self.cell;
        for found in ctx.registry.resources_at(cell) {
            let picked = Resource::try_pick_by(ctx.registry, found.id, cell, self);
            if !picked
                && found.color == self.color
                && found.state == ResourceState::Unclaimed
                && self.carried.is_some()
            {
                if self.find_free_row(ctx).is_some() {
                    debug!(agent = %self.name, %cell, resource = %found.id, "Own resource left for a later pass");
                    self.enqueue_report(cell, self.id);
                } else {
                    debug!(agent = %self.name, %cell, resource = %found.id, "Own resource left behind, lane full");
                }
            }
        }
    }
}
