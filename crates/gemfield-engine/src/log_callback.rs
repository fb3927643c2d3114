//! Tick callback that reports simulation progress through `tracing`.

use std::collections::BTreeMap;

use gemfield_core::runner::TickCallback;
use gemfield_core::tick::{SimulationState, TickSummary};
use gemfield_types::AgentPhase;
use tracing::{debug, info};

/// Callback that logs every tick at debug level, and deliveries and
/// phase changes at info level.
#[derive(Debug, Default)]
pub struct LogCallback {
    last_phase_counts: BTreeMap<AgentPhase, u32>,
}

impl LogCallback {
    /// Create a callback with no phase history.
    pub const fn new() -> Self {
        Self {
            last_phase_counts: BTreeMap::new(),
        }
    }

    /// Whether the phase mix differs from the previous tick.
    fn phases_changed(&self, summary: &TickSummary) -> bool {
        self.last_phase_counts != summary.phase_counts
    }
}

impl TickCallback for LogCallback {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        debug!(
            tick = summary.tick,
            deliveries = summary.deliveries,
            agents_done = summary.agents_done,
            agents_total = summary.agents_total,
            "Tick completed"
        );

        if summary.deliveries > 0 {
            info!(
                tick = summary.tick,
                deliveries = summary.deliveries,
                total_delivered = state.total_delivered(),
                "Resources delivered"
            );
        }

        if self.phases_changed(summary) {
            info!(tick = summary.tick, phases = ?summary.phase_counts, "Phase mix changed");
            self.last_phase_counts.clone_from(&summary.phase_counts);
        }
    }
}
