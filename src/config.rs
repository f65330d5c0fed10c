use std::time::Duration;

use thiserror::Error;

use crate::engine::Counter;
use crate::grid::GridError;
use crate::topology::Topology;

pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1600,
    height: 900,
};
pub const DEFAULT_CELL_SIZE: u32 = 50;
pub const DEFAULT_TICK_RATE: u32 = 10;
pub const DEFAULT_LIVE_PROBABILITY: f64 = 0.5;

/// Size of the drawing surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        DEFAULT_RESOLUTION
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Cell size must be at least one pixel")]
    ZeroCellSize,

    #[error("Tick rate must be at least one tick per second")]
    ZeroTickRate,

    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),
}

/// Everything the host decides before the simulation starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub resolution: Resolution,

    /// Side length of a cell, in pixels
    pub cell_size: u32,

    /// Generations per second
    pub tick_rate: u32,

    /// Chance of each cell starting out alive
    pub live_probability: f64,

    pub topology: Topology,
    pub counter: Counter,

    /// Seed for the initial state. `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            cell_size: DEFAULT_CELL_SIZE,
            tick_rate: DEFAULT_TICK_RATE,
            live_probability: DEFAULT_LIVE_PROBABILITY,
            topology: Topology::default(),
            counter: Counter::default(),
            seed: None,
        }
    }
}

impl Config {
    /// Grid dimensions in cells, `(width, height)`. Any leftover pixels past the last whole cell
    /// are dropped.
    pub fn grid_dimensions(&self) -> Result<(usize, usize), ConfigError> {
        if self.cell_size == 0 {
            return Err(ConfigError::ZeroCellSize);
        }

        let width = (self.resolution.width / self.cell_size) as usize;
        let height = (self.resolution.height / self.cell_size) as usize;

        let min = self.topology.min_side();
        if width < min || height < min {
            return Err(GridError::TooSmall {
                width,
                height,
                topology: self.topology,
                min,
            }
            .into());
        }

        Ok((width, height))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }

        if !(0.0..=1.0).contains(&self.live_probability) {
            return Err(GridError::InvalidProbability(self.live_probability).into());
        }

        self.grid_dimensions()?;

        Ok(())
    }

    /// Time budget of a single tick.
    pub fn frame_time(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}
