pub mod camera;
pub mod config;
pub mod engine;
pub mod grid;
pub mod rule_set;
pub mod topology;

/// Terminal dimensions, in characters.
pub type ScreenSize = u16;

/// Signed cell coordinate, so that neighbor offsets can step past the edge of the grid.
pub type CellCoord = isize;
