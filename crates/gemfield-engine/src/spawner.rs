//! Spawner that seeds the board with agents and resources.
//!
//! The grid's columns are split into one contiguous band per agent. Each
//! agent sweeps its band at full depth, keeps its lane in the band's first
//! column, and owns one color of [`Color::ALL`] in order. Agents start on a
//! random free cell (or on their home cell), and each agent's color gets a
//! fixed number of resources on further random free cells. All draws come
//! from a [`StdRng`] seeded from the configuration, so a seed always
//! reproduces the same layout.

use std::collections::BTreeSet;

use gemfield_agents::{Agent, AgentSpec};
use gemfield_core::config::SimulationConfig;
use gemfield_types::{Cell, Color, Zone};
use gemfield_world::{Board, GridGeometry, Registry, Resource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::error::EngineError;

/// The output of the spawner.
#[derive(Debug)]
pub struct SpawnResult {
    /// Agents in spawn order.
    pub agents: Vec<Agent>,
    /// Color and cell of every resource placed.
    pub placements: Vec<(Color, Cell)>,
}

/// Spawn the configured agents and resources onto `board`.
///
/// Agents are registered as color owners and claim their starting cells;
/// resources are registered `Unclaimed` at their cells.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if the population does not fit the
/// palette or the grid, or [`EngineError::Agent`] if an agent rejects its
/// configuration.
pub fn spawn_world(
    config: &SimulationConfig,
    board: &Board,
    registry: &Registry,
) -> Result<SpawnResult, EngineError> {
    let count = config.agents.count;
    if usize::try_from(count).unwrap_or(usize::MAX) > Color::ALL.len() {
        return Err(EngineError::Spawner {
            message: format!("{count} agents requested but only {} colors exist", Color::ALL.len()),
        });
    }

    let mut rng = StdRng::seed_from_u64(config.world.seed);
    let attempts = config.resources.placement_attempts;
    let mut occupied: BTreeSet<Cell> = BTreeSet::new();
    let agent_config = config.agent_config();
    let place_at_home = config.agents.place_at_home;

    let mut agents = Vec::with_capacity(Color::ALL.len());
    for (k, color) in (0..count).zip(Color::ALL) {
        let zone = band_zone(k, count, board)?;
        let home = Cell::new(zone.min_x, 0);
        let spawn = if place_at_home {
            home
        } else {
            pick_free_cell(&mut rng, board, &occupied, attempts)
        };
        occupied.insert(spawn);

        let spec = AgentSpec {
            name: format!("A{}", k.saturating_add(1)),
            color,
            zone,
            home,
            start: board.cell_to_position(spawn),
            go_home_first: config.agents.go_home_first && !place_at_home,
        };
        let agent = Agent::new(spec, agent_config.clone(), registry, board)?;
        info!(
            agent = agent.name(),
            %color,
            spawn = %spawn,
            home = %home,
            zone_x = ?(zone.min_x, zone.max_x),
            "Agent spawned"
        );
        agents.push(agent);
    }

    let colors: Vec<Color> = agents.iter().map(Agent::color).collect();
    let mut placements = Vec::new();
    for color in colors {
        for _ in 0..config.resources.per_color {
            let cell = pick_free_cell(&mut rng, board, &occupied, attempts);
            occupied.insert(cell);
            registry.register_resource(Resource::new(color, cell));
            placements.push((color, cell));
        }
    }
    info!(
        agents = agents.len(),
        resources = placements.len(),
        seed = config.world.seed,
        "World seeded"
    );

    Ok(SpawnResult { agents, placements })
}

/// Zone of the `k`-th of `count` column bands, at full board depth.
fn band_zone(k: u32, count: u32, board: &Board) -> Result<Zone, EngineError> {
    let width = board.width();
    let start = band_start(k, count, width);
    let end = band_start(k.saturating_add(1), count, width).and_then(|next| next.checked_sub(1));
    match (start, end) {
        (Some(min_x), Some(max_x)) if min_x <= max_x => Ok(Zone::new(
            min_x,
            max_x,
            0,
            board.depth().saturating_sub(1),
        )),
        _ => Err(EngineError::Spawner {
            message: format!("cannot split {width} columns into {count} bands"),
        }),
    }
}

/// First column of band `k`: `ceil(k * width / count)`.
fn band_start(k: u32, count: u32, width: i32) -> Option<i32> {
    let count = i64::from(count);
    let scaled = i64::from(k).checked_mul(i64::from(width))?;
    let start = scaled.checked_add(count.checked_sub(1)?)?.checked_div(count)?;
    i32::try_from(start).ok()
}

/// A uniformly drawn cell not in `occupied`, falling back to `(0, 0)`
/// after `attempts` collisions.
fn pick_free_cell(
    rng: &mut impl Rng,
    board: &Board,
    occupied: &BTreeSet<Cell>,
    attempts: u32,
) -> Cell {
    for _ in 0..attempts {
        let candidate = Cell::new(
            rng.random_range(0..board.width()),
            rng.random_range(0..board.depth()),
        );
        if !occupied.contains(&candidate) {
            return candidate;
        }
    }
    warn!(attempts, "No free cell found, placing at (0, 0)");
    Cell::new(0, 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gemfield_types::Position;

    use super::*;

    fn board(width: i32, depth: i32) -> Board {
        Board::new(width, depth, 1.0, Position::default()).unwrap()
    }

    fn bands(width: i32, count: u32) -> Vec<(i32, i32)> {
        let board = board(width, 3);
        (0..count)
            .map(|k| {
                let zone = band_zone(k, count, &board).unwrap();
                (zone.min_x, zone.max_x)
            })
            .collect()
    }

    #[test]
    fn five_columns_split_two_two_one() {
        assert_eq!(bands(5, 3), vec![(0, 1), (2, 3), (4, 4)]);
    }

    #[test]
    fn bands_cover_every_column_once() {
        for width in 1..=12 {
            for count in 1..=3_u32 {
                if i64::from(count) > i64::from(width) {
                    continue;
                }
                let split = bands(width, count);
                assert_eq!(split.first().unwrap().0, 0);
                assert_eq!(split.last().unwrap().1, width.saturating_sub(1));
                for pair in split.windows(2) {
                    if let [left, right] = pair {
                        assert_eq!(left.1.saturating_add(1), right.0);
                    }
                }
            }
        }
    }

    #[test]
    fn zones_span_full_depth() {
        let board = board(5, 7);
        let zone = band_zone(1, 3, &board).unwrap();
        assert_eq!((zone.min_z, zone.max_z), (0, 6));
    }

    #[test]
    fn spawns_agents_and_resources() {
        let config = SimulationConfig::default();
        let board = board(config.grid.width, config.grid.depth);
        let registry = Registry::new();

        let result = spawn_world(&config, &board, &registry).unwrap();

        assert_eq!(result.agents.len(), 3);
        assert_eq!(result.placements.len(), 9);
        assert_eq!(registry.resources().len(), 9);
        let names: Vec<&str> = result.agents.iter().map(Agent::name).collect();
        assert_eq!(names, vec!["A1", "A2", "A3"]);
        for (agent, color) in result.agents.iter().zip(Color::ALL) {
            assert_eq!(agent.color(), color);
            assert_eq!(registry.get_owner(color), Some(agent.id()));
            assert_eq!(agent.home().z, 0);
            assert_eq!(agent.home().x, agent.zone().min_x);
        }
    }

    #[test]
    fn placements_never_share_a_cell() {
        let config = SimulationConfig::default();
        let board = board(config.grid.width, config.grid.depth);
        let registry = Registry::new();

        let result = spawn_world(&config, &board, &registry).unwrap();

        let mut cells: BTreeSet<Cell> = result.agents.iter().map(Agent::cell).collect();
        cells.extend(result.placements.iter().map(|(_, cell)| *cell));
        assert_eq!(cells.len(), 12);
    }

    #[test]
    fn same_seed_same_layout() {
        let config = SimulationConfig::default();
        let board = board(config.grid.width, config.grid.depth);

        let first = spawn_world(&config, &board, &Registry::new()).unwrap();
        let second = spawn_world(&config, &board, &Registry::new()).unwrap();

        assert_eq!(first.placements, second.placements);
        let starts = |r: &SpawnResult| r.agents.iter().map(Agent::cell).collect::<Vec<_>>();
        assert_eq!(starts(&first), starts(&second));
    }

    #[test]
    fn place_at_home_starts_on_home_cells() {
        let mut config = SimulationConfig::default();
        config.agents.place_at_home = true;
        let board = board(config.grid.width, config.grid.depth);
        let registry = Registry::new();

        let result = spawn_world(&config, &board, &registry).unwrap();

        let homes: Vec<Cell> = result.agents.iter().map(Agent::cell).collect();
        assert_eq!(homes, vec![Cell::new(0, 0), Cell::new(2, 0), Cell::new(4, 0)]);
    }

    #[test]
    fn crowded_board_falls_back_to_origin() {
        let board = board(1, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let occupied: BTreeSet<Cell> = [Cell::new(0, 0)].into_iter().collect();
        assert_eq!(pick_free_cell(&mut rng, &board, &occupied, 10), Cell::new(0, 0));
    }
}
