//! Engine binary for the Gemfield simulation.
//!
//! Loads configuration, seeds the board with agents and resources, and
//! runs the tick loop until every agent is done, the tick limit is hit,
//! or the operator presses Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `gemfield-config.yaml` (or a path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Create the board and the simulation clock
//! 4. Spawn agents and resources into a fresh registry
//! 5. Create run control from simulation bounds and hook up Ctrl-C
//! 6. Run the simulation loop
//! 7. Log the result and the final board snapshot

mod error;
mod log_callback;
mod spawner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gemfield_core::clock::SimulationClock;
use gemfield_core::config::SimulationConfig;
use gemfield_core::operator::RunControl;
use gemfield_core::runner;
use gemfield_core::tick::SimulationState;
use gemfield_types::Position;
use gemfield_world::{Board, Registry};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::log_callback::LogCallback;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "gemfield-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        config = %config_path.display(),
        "gemfield-engine starting"
    );

    // 3. Board and clock.
    let board = Board::new(
        config.grid.width,
        config.grid.depth,
        config.grid.cell_size,
        Position::new(config.grid.origin_x, config.grid.origin_z),
    )
    .map_err(EngineError::from)?;
    let clock = SimulationClock::new(config.world.seconds_per_tick).map_err(EngineError::from)?;
    info!(
        width = config.grid.width,
        depth = config.grid.depth,
        cell_size = config.grid.cell_size,
        "Board initialized"
    );

    // 4. Agents and resources.
    let registry = Registry::new();
    let spawn_result = spawner::spawn_world(&config, &board, &registry)?;
    info!(
        agents_spawned = spawn_result.agents.len(),
        resources_placed = spawn_result.placements.len(),
        "Spawn complete"
    );

    // 5. Run control and Ctrl-C.
    let control = Arc::new(RunControl::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    info!(
        max_ticks = control.max_ticks(),
        tick_interval_ms = control.tick_interval_ms(),
        "Run control initialized"
    );
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping after the current tick");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    // 6. Run.
    let mut state = SimulationState {
        clock,
        board,
        registry,
        agents: spawn_result.agents,
    };
    let mut callback = LogCallback::new();
    let result = runner::run_simulation(&mut state, &control, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 7. Report.
    runner::log_simulation_end(&result, &state);
    match serde_json::to_string(&state.board_snapshot()) {
        Ok(json) => debug!(snapshot = %json, "Final board snapshot"),
        Err(e) => warn!(error = %e, "Failed to serialize final board snapshot"),
    }

    info!("gemfield-engine shutdown complete");
    Ok(())
}

/// Load simulation configuration from `path`.
///
/// Falls back to defaults (still subject to environment overrides) when
/// the file does not exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        return Ok(SimulationConfig::from_file(path)?);
    }
    let mut config = SimulationConfig::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}
