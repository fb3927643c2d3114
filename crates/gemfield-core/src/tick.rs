//! Tick cycle: one scheduler tick of the Gemfield simulation.
//!
//! Each tick runs through these phases:
//!
//! 1. **Clock** -- advance the tick counter.
//! 2. **Step** -- step every unfinished agent once, in spawn order. Each
//!    agent runs until its next yield point: a reservation wait, one
//!    interpolation step, the end of a harvest route, one settle tick,
//!    or one tidy attempt.
//! 3. **Summarize** -- count agents per phase and deliveries made.
//!
//! The tick cycle is deterministic given the same initial state.

use std::collections::BTreeMap;

use gemfield_agents::{Agent, StepContext};
use gemfield_types::{AgentPhase, AgentSnapshot, BoardSnapshot};
use gemfield_world::{Board, Registry};
use tracing::trace;

use crate::clock::{ClockError, SimulationClock};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Number of agents in each phase at end of tick.
    pub phase_counts: BTreeMap<AgentPhase, u32>,
    /// Resources delivered during this tick.
    pub deliveries: u32,
    /// Agents in the `Done` phase at end of tick.
    pub agents_done: u32,
    /// Total number of agents.
    pub agents_total: u32,
}

impl TickSummary {
    /// Whether every agent has finished.
    pub const fn all_done(&self) -> bool {
        self.agents_done >= self.agents_total
    }
}

/// The mutable simulation state passed through the tick cycle.
pub struct SimulationState {
    /// The simulation clock.
    pub clock: SimulationClock,
    /// Board geometry.
    pub board: Board,
    /// Shared coordination registry; also answers delivery's occupancy checks.
    pub registry: Registry,
    /// Agents in spawn order.
    pub agents: Vec<Agent>,
}

impl SimulationState {
    /// Total resources delivered so far across all agents.
    pub fn total_delivered(&self) -> u32 {
        self.agents
            .iter()
            .fold(0_u32, |sum, agent| sum.saturating_add(agent.delivered_count()))
    }

    /// Read-only view of every agent.
    pub fn agent_snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(Agent::snapshot).collect()
    }

    /// Read-only view of the board at the current tick.
    pub fn board_snapshot(&self) -> BoardSnapshot {
        self.registry.snapshot(self.clock.tick())
    }
}

/// Execute a single tick.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter overflows.
pub fn run_tick(state: &mut SimulationState) -> Result<TickSummary, TickError> {
    // --- Phase 1: Clock ---
    let tick = state.clock.advance()?;
    let delivered_before = state.total_delivered();

    // --- Phase 2: Step ---
    let ctx = StepContext {
        registry: &state.registry,
        geometry: &state.board,
        probe: &state.registry,
        seconds_per_tick: state.clock.seconds_per_tick(),
    };
    for agent in state.agents.iter_mut().filter(|agent| !agent.is_done()) {
        let phase = agent.step(&ctx);
        trace!(tick, agent = agent.name(), ?phase, cell = %agent.cell(), "Agent stepped");
    }

    // --- Phase 3: Summarize ---
    let mut phase_counts: BTreeMap<AgentPhase, u32> = BTreeMap::new();
    for agent in &state.agents {
        let count = phase_counts.entry(agent.phase()).or_insert(0);
        *count = count.saturating_add(1);
    }
    let agents_done = phase_counts.get(&AgentPhase::Done).copied().unwrap_or(0);
    let agents_total = u32::try_from(state.agents.len()).unwrap_or(u32::MAX);
    let deliveries = state.total_delivered().saturating_sub(delivered_before);

    Ok(TickSummary {
        tick,
        phase_counts,
        deliveries,
        agents_done,
        agents_total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gemfield_agents::{AgentConfig, AgentSpec};
    use gemfield_types::{Cell, Color, Position, Zone};
    use gemfield_world::{GridGeometry, Resource};

    use super::*;

    fn single_agent_state() -> SimulationState {
        let board = Board::new(3, 3, 1.0, Position::default()).unwrap();
        let registry = Registry::new();
        registry.register_resource(Resource::new(Color::Red, Cell::new(1, 0)));
        let spec = AgentSpec {
            name: String::from("A1"),
            color: Color::Red,
            zone: Zone::new(0, 2, 0, 2),
            home: Cell::new(0, 0),
            start: board.cell_to_position(Cell::new(0, 0)),
            go_home_first: true,
        };
        let config = AgentConfig {
            tidy_settle_ticks: 1,
            ..AgentConfig::default()
        };
        let agent = Agent::new(spec, config, &registry, &board).unwrap();
        SimulationState {
            clock: SimulationClock::new(0.5).unwrap(),
            board,
            registry,
            agents: vec![agent],
        }
    }

    #[test]
    fn tick_advances_clock_and_counts_phases() {
        let mut state = single_agent_state();
        let summary = run_tick(&mut state).unwrap();

        assert_eq!(summary.tick, 1);
        assert_eq!(state.clock.tick(), 1);
        assert_eq!(summary.agents_total, 1);
        assert_eq!(summary.phase_counts.values().sum::<u32>(), 1);
        assert_eq!(summary.phase_counts.get(&AgentPhase::Exploring), Some(&1));
        assert!(!summary.all_done());
    }

    #[test]
    fn deliveries_are_counted_on_the_tick_they_happen() {
        let mut state = single_agent_state();
        let mut total: u32 = 0;
        for _ in 0..500 {
            let summary = run_tick(&mut state).unwrap();
            total = total.saturating_add(summary.deliveries);
            if summary.all_done() {
                break;
            }
        }
        assert_eq!(total, 1);
        assert_eq!(state.total_delivered(), 1);
        assert_eq!(state.board_snapshot().resources.len(), 1);
    }

    #[test]
    fn done_agents_are_not_stepped() {
        let mut state = single_agent_state();
        while !run_tick(&mut state).unwrap().all_done() {}
        let before = state.agent_snapshots();
        let _ = run_tick(&mut state).unwrap();
        assert_eq!(state.agent_snapshots(), before);
    }

    #[test]
    fn clock_overflow_surfaces_as_tick_error() {
        let mut state = single_agent_state();
        state.clock = SimulationClock::from_parts(u64::MAX, 0.5).unwrap();
        assert!(matches!(run_tick(&mut state), Err(TickError::Clock { .. })));
    }
}
