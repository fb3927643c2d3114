//! Simulation loop runner with run controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Natural end**: stop once every agent is `Done`
//! - **Bounded simulation**: stop after `max_ticks`
//! - **Fixed tick interval** taken from [`RunControl`]
//! - **Operator stop**: clean stop before the next tick
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it. With a zero tick interval it yields to the
//! runtime between ticks instead of sleeping.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;

use tracing::{info, warn};

use crate::operator::{RunControl, SimulationEndReason};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
///
/// Implementations can use this to log progress or publish snapshots.
/// The callback receives the tick summary and the current simulation
/// state.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Arguments
///
/// * `state` - Mutable simulation state (board, registry, agents, clock)
/// * `control` - Shared run control state
/// * `callback` - Called after each tick
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_simulation(
    state: &mut SimulationState,
    control: &Arc<RunControl>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        agents = state.agents.len(),
        max_ticks = control.max_ticks(),
        tick_interval_ms = control.tick_interval_ms(),
        "Simulation starting"
    );

    loop {
        // --- Check stop request (before tick) ---
        if control.is_stop_requested() {
            info!("Operator stop requested");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::OperatorStop,
                final_summary: last_summary,
                total_ticks,
            });
        }

        // --- Execute tick ---
        let summary = tick::run_tick(state)?;
        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(&summary, state);

        // --- Check natural end ---
        if summary.all_done() {
            info!(tick = summary.tick, "All agents done");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::AllAgentsDone,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        // --- Check tick limit (after tick) ---
        if control.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = control.max_ticks(),
                "Tick limit reached"
            );
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        last_summary = Some(summary);

        // --- Wait for the next tick ---
        let interval_ms = control.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult, state: &SimulationState) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        delivered = state.total_delivered(),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            agents_done = summary.agents_done,
            agents_total = summary.agents_total,
            phases = ?summary.phase_counts,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
    for agent in &state.agents {
        info!(
            agent = agent.name(),
            color = %agent.color(),
            phase = ?agent.phase(),
            delivered = agent.delivered_count(),
            cell = %agent.cell(),
            "Agent final state"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gemfield_agents::{Agent, AgentConfig, AgentSpec};
    use gemfield_types::{Cell, Color, Position, Zone};
    use gemfield_world::{Board, GridGeometry, Registry, Resource};

    use super::*;
    use crate::clock::SimulationClock;
    use crate::config::SimulationBoundsConfig;

    fn make_simulation_state() -> SimulationState {
        let board = Board::new(4, 3, 1.0, Position::default()).unwrap();
        let registry = Registry::new();
        registry.register_resource(Resource::new(Color::Red, Cell::new(1, 2)));
        registry.register_resource(Resource::new(Color::Green, Cell::new(0, 1)));

        let config = AgentConfig {
            tidy_settle_ticks: 20,
            ..AgentConfig::default()
        };
        let agents = [
            (Color::Red, Zone::new(0, 1, 0, 2), Cell::new(0, 0)),
            (Color::Green, Zone::new(2, 3, 0, 2), Cell::new(2, 0)),
        ]
        .into_iter()
        .map(|(color, zone, home)| {
            let spec = AgentSpec {
                name: format!("{color}"),
                color,
                zone,
                home,
                start: board.cell_to_position(home),
                go_home_first: true,
            };
            Agent::new(spec, config.clone(), &registry, &board).unwrap()
        })
        .collect();

        SimulationState {
            clock: SimulationClock::new(0.25).unwrap(),
            board,
            registry,
            agents,
        }
    }

    fn control(max_ticks: u64) -> Arc<RunControl> {
        Arc::new(RunControl::new(0, &SimulationBoundsConfig { max_ticks }))
    }

    #[tokio::test]
    async fn runs_until_all_agents_done() {
        let mut state = make_simulation_state();
        let result = run_simulation(&mut state, &control(0), &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::AllAgentsDone);
        let summary = result.final_summary.unwrap();
        assert_eq!(summary.agents_done, 2);
        assert_eq!(summary.tick, result.total_ticks);
        assert_eq!(state.total_delivered(), 2);
    }

    #[tokio::test]
    async fn bounded_by_max_ticks() {
        let mut state = make_simulation_state();
        let result = run_simulation(&mut state, &control(5), &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
    }

    #[tokio::test]
    async fn operator_stop() {
        let mut state = make_simulation_state();
        let control = control(0);
        control.request_stop();

        let result = run_simulation(&mut state, &control, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn stop_from_callback_ends_after_that_tick() {
        struct StopAfter {
            control: Arc<RunControl>,
            at: u64,
        }
        impl TickCallback for StopAfter {
            fn on_tick(&mut self, summary: &TickSummary, _state: &SimulationState) {
                if summary.tick == self.at {
                    self.control.request_stop();
                }
            }
        }

        let mut state = make_simulation_state();
        let control = control(0);
        let mut cb = StopAfter {
            control: Arc::clone(&control),
            at: 3,
        };
        let result = run_simulation(&mut state, &control, &mut cb).await.unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 3);
        assert_eq!(result.final_summary.unwrap().tick, 3);
    }

    #[tokio::test]
    async fn tick_callback_is_called() {
        struct CountCallback {
            count: u64,
        }
        impl TickCallback for CountCallback {
            fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {
                self.count = self.count.saturating_add(1);
            }
        }

        let mut state = make_simulation_state();
        let mut cb = CountCallback { count: 0 };
        let _ = run_simulation(&mut state, &control(3), &mut cb).await.unwrap();

        assert_eq!(cb.count, 3);
    }
}
