//! Configuration loading and typed config structures for the Gemfield simulation.
//!
//! The canonical configuration lives in `gemfield-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.

use std::path::Path;

use gemfield_agents::AgentConfig;
use gemfield_types::Color;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `gemfield-config.yaml`. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Board dimensions and placement.
    #[serde(default)]
    pub grid: GridConfig,

    /// Agent population and behaviour tuning.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Initial resource placement.
    #[serde(default)]
    pub resources: ResourcesConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `GEMFIELD_SEED` overrides `world.seed`
    /// - `GEMFIELD_MAX_TICKS` overrides `simulation.max_ticks`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides and validating the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set but is not a
    /// number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(seed) = env_u64("GEMFIELD_SEED")? {
            self.world.seed = seed;
        }
        if let Some(max_ticks) = env_u64("GEMFIELD_MAX_TICKS")? {
            self.simulation.max_ticks = max_ticks;
        }
        Ok(())
    }

    /// Check that the configuration describes a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty grids, a population of
    /// zero or larger than the palette, agents wider than the grid, or
    /// non-positive speeds, cell sizes, or tick lengths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width <= 0 || self.grid.depth <= 0 {
            return Err(invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid.width, self.grid.depth
            )));
        }
        if !self.grid.cell_size.is_finite() || self.grid.cell_size <= 0.0 {
            return Err(invalid(format!(
                "grid.cell_size must be positive, got {}",
                self.grid.cell_size
            )));
        }
        let palette = Color::ALL.len();
        let count = usize::try_from(self.agents.count).unwrap_or(usize::MAX);
        if count == 0 || count > palette {
            return Err(invalid(format!(
                "agents.count must be between 1 and {palette}, got {}",
                self.agents.count
            )));
        }
        if i64::from(self.agents.count) > i64::from(self.grid.width) {
            return Err(invalid(format!(
                "agents.count {} exceeds grid width {}",
                self.agents.count, self.grid.width
            )));
        }
        if !self.world.seconds_per_tick.is_finite() || self.world.seconds_per_tick <= 0.0 {
            return Err(invalid(format!(
                "world.seconds_per_tick must be positive, got {}",
                self.world.seconds_per_tick
            )));
        }
        self.agent_config()
            .validate()
            .map_err(|err| invalid(err.to_string()))
    }

    /// Per-agent behaviour tuning derived from the `agents` section.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            move_speed: self.agents.move_speed,
            tidy_settle_ticks: self.agents.tidy_settle_ticks,
            tidy_max_attempts: self.agents.tidy_max_attempts,
            reservation_patience: self.agents.reservation_patience,
            visit_retries: self.agents.visit_retries,
            ..AgentConfig::default()
        }
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_err| invalid(format!("{name} must be an unsigned integer, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducible placement.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between ticks (0 = as fast as possible).
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// Simulated seconds one tick represents.
    #[serde(default = "default_seconds_per_tick")]
    pub seconds_per_tick: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: 0,
            seconds_per_tick: default_seconds_per_tick(),
        }
    }
}

/// Board configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_grid_size")]
    pub width: i32,

    /// Number of rows.
    #[serde(default = "default_grid_size")]
    pub depth: i32,

    /// Side length of one cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// World X coordinate of the board centre.
    #[serde(default)]
    pub origin_x: f64,

    /// World Z coordinate of the board centre.
    #[serde(default)]
    pub origin_z: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_size(),
            depth: default_grid_size(),
            cell_size: default_cell_size(),
            origin_x: 0.0,
            origin_z: 0.0,
        }
    }
}

/// Agent population and behaviour configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentsConfig {
    /// Number of agents, one per color.
    #[serde(default = "default_agent_count")]
    pub count: u32,

    /// World units travelled per simulated second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,

    /// Walk home before sweeping.
    #[serde(default = "default_true")]
    pub go_home_first: bool,

    /// Spawn every agent on its home cell instead of a random cell.
    #[serde(default)]
    pub place_at_home: bool,

    /// Ticks to wait before the tidy pass.
    #[serde(default = "default_tidy_settle_ticks")]
    pub tidy_settle_ticks: u32,

    /// Maximum compaction attempts in the tidy pass.
    #[serde(default = "default_tidy_max_attempts")]
    pub tidy_max_attempts: u32,

    /// Ticks to wait on a contended cell before skipping it
    /// (`null` = wait forever).
    #[serde(default = "default_reservation_patience")]
    pub reservation_patience: Option<u32>,

    /// Times an abandoned visit is retried before the cell is given up.
    #[serde(default = "default_visit_retries")]
    pub visit_retries: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            count: default_agent_count(),
            move_speed: default_move_speed(),
            go_home_first: true,
            place_at_home: false,
            tidy_settle_ticks: default_tidy_settle_ticks(),
            tidy_max_attempts: default_tidy_max_attempts(),
            reservation_patience: default_reservation_patience(),
            visit_retries: default_visit_retries(),
        }
    }
}

/// Initial resource placement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourcesConfig {
    /// Resources spawned for each agent's color.
    #[serde(default = "default_per_color")]
    pub per_color: u32,

    /// Random draws tried per resource before falling back to cell (0, 0).
    #[serde(default = "default_placement_attempts")]
    pub placement_attempts: u32,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            per_color: default_per_color(),
            placement_attempts: default_placement_attempts(),
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum ticks before the run stops (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("Gemfield")
}

const fn default_seed() -> u64 {
    42
}

const fn default_seconds_per_tick() -> f64 {
    0.05
}

const fn default_grid_size() -> i32 {
    5
}

const fn default_cell_size() -> f64 {
    1.0
}

const fn default_agent_count() -> u32 {
    3
}

const fn default_move_speed() -> f64 {
    2.0
}

const fn default_tidy_settle_ticks() -> u32 {
    200
}

const fn default_tidy_max_attempts() -> u32 {
    4
}

#[allow(clippy::unnecessary_wraps)]
const fn default_reservation_patience() -> Option<u32> {
    Some(100)
}

const fn default_visit_retries() -> u32 {
    3
}

const fn default_per_color() -> u32 {
    3
}

const fn default_placement_attempts() -> u32 {
    200
}

const fn default_max_ticks() -> u64 {
    20_000
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}
