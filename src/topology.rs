use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::CellCoord;

/// How the edges of the grid behave.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Edges wrap around, so the grid is a torus and every cell has exactly 8 neighbors.
    #[default]
    Toroidal,

    /// Legacy border handling. Only the interior `[1, dim - 2]` is ever updated, which means the
    /// outermost ring of cells keeps whatever state it was seeded with, forever. Reads outside the
    /// grid are dead.
    Clipped,
}

#[derive(Debug, Error)]
#[error("Unknown topology \"{0}\", expected \"toroidal\" or \"clipped\"")]
pub struct TopologyError(String);

impl Topology {
    /// Smallest grid side length this topology can simulate.
    ///
    /// On a torus, a side of 3 is needed so that a cell's left and right neighbors are distinct
    /// cells from itself.
    pub const fn min_side(self) -> usize {
        match self {
            Topology::Toroidal => 3,
            Topology::Clipped => 1,
        }
    }

    /// Map a possibly out of range coordinate onto `[0, side)`. Returns `None` if the coordinate
    /// lies outside the grid and this topology doesn't wrap.
    #[inline]
    pub fn resolve(self, i: CellCoord, side: usize) -> Option<usize> {
        match self {
            Topology::Toroidal => Some(i.rem_euclid(side as CellCoord) as usize),
            Topology::Clipped => {
                if (0..side as CellCoord).contains(&i) {
                    Some(i as usize)
                } else {
                    None
                }
            }
        }
    }

    /// Whether the transition leaves an outer ring of cells untouched.
    pub const fn has_frozen_border(self) -> bool {
        matches!(self, Topology::Clipped)
    }

    /// Range of indices along a side of length `side` that the transition visits.
    pub fn scan(self, side: usize) -> std::ops::Range<usize> {
        match self {
            Topology::Toroidal => 0..side,
            Topology::Clipped => 1..side.saturating_sub(1).max(1),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Toroidal => write!(f, "toroidal"),
            Topology::Clipped => write!(f, "clipped"),
        }
    }
}

impl FromStr for Topology {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toroidal" | "torus" | "wrap" => Ok(Topology::Toroidal),
            "clipped" | "clip" => Ok(Topology::Clipped),
            _ => Err(TopologyError(s.to_string())),
        }
    }
}
