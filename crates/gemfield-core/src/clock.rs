//! Simulation clock.
//!
//! The tick counter is the only notion of time. Agents see it through the
//! fixed number of simulated seconds one tick represents, which scales
//! their movement.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// The tick length is not a finite positive number.
    #[error("invalid tick length: {seconds_per_tick}")]
    InvalidTickLength {
        /// The rejected length in seconds.
        seconds_per_tick: f64,
    },
}

/// Tick counter plus the simulated duration of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    /// Last completed tick (0 before the first tick).
    tick: u64,

    /// Simulated seconds per tick.
    seconds_per_tick: f64,
}

impl SimulationClock {
    /// Create a clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTickLength`] if `seconds_per_tick` is
    /// not finite and positive.
    pub fn new(seconds_per_tick: f64) -> Result<Self, ClockError> {
        Self::from_parts(0, seconds_per_tick)
    }

    /// Create a clock at an explicit tick (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTickLength`] if `seconds_per_tick` is
    /// not finite and positive.
    pub fn from_parts(tick: u64, seconds_per_tick: f64) -> Result<Self, ClockError> {
        if !seconds_per_tick.is_finite() || seconds_per_tick <= 0.0 {
            return Err(ClockError::InvalidTickLength { seconds_per_tick });
        }
        Ok(Self {
            tick,
            seconds_per_tick,
        })
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the simulated seconds per tick.
    pub const fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_tick
    }
}
