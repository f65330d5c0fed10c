use std::fmt;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;

use crate::CellCoord;
use crate::topology::Topology;

/// Character used for live cells when reading and printing grids.
pub const ALIVE: char = '#';

/// Character used for dead cells when reading and printing grids.
pub const DEAD: char = '.';

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("A {width}x{height} grid is too small for a {topology} topology (each side needs at least {min} cells)")]
    TooSmall {
        width: usize,
        height: usize,
        topology: Topology,
        min: usize,
    },

    #[error("A {width}x{height} grid has too many cells to allocate")]
    TooLarge { width: usize, height: usize },

    #[error("Live probability must lie within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Row {row} has {got} cells, expected {exp}")]
    RaggedRow { row: usize, exp: usize, got: usize },

    #[error("Unexpected character '{ch}' at row {row}, column {col}")]
    InvalidCell { ch: char, row: usize, col: usize },

    #[error("Cell ({x}, {y}) lies outside of a {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Double buffered cell storage.
///
/// `current` holds the published generation and is what every read sees. `next` is where the
/// following generation gets written, one cell at a time, until [`Grid::swap_generations`]
/// publishes it. Cells are stored row-major, so cell `(x, y)` lives at `y * width + x`.
#[derive(Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    topology: Topology,

    current: Vec<bool>,
    next: Vec<bool>,
}

impl Grid {
    /// Create an all dead grid.
    pub fn new(width: usize, height: usize, topology: Topology) -> Result<Self, GridError> {
        let min = topology.min_side();

        if width < min || height < min {
            return Err(GridError::TooSmall {
                width,
                height,
                topology,
                min,
            });
        }

        // a Vec can't hold more than isize::MAX bytes
        let n = width
            .checked_mul(height)
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or(GridError::TooLarge { width, height })?;

        Ok(Self {
            width,
            height,
            topology,
            current: Self::alloc(n, width, height)?,
            next: Self::alloc(n, width, height)?,
        })
    }

    /// An all dead buffer of `n` cells, or `TooLarge` if there isn't memory for it.
    fn alloc(n: usize, width: usize, height: usize) -> Result<Vec<bool>, GridError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(n)
            .map_err(|_| GridError::TooLarge { width, height })?;
        buf.resize(n, false);

        Ok(buf)
    }

    /// Create a grid where exactly the cells listed in `live` are alive.
    pub fn from_cells<I>(
        width: usize,
        height: usize,
        topology: Topology,
        live: I,
    ) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut grid = Self::new(width, height, topology)?;

        for (x, y) in live {
            if x >= width || y >= height {
                return Err(GridError::OutOfBounds {
                    x,
                    y,
                    width,
                    height,
                });
            }

            grid.current[y * width + x] = true;
        }

        grid.sync_next();

        Ok(grid)
    }

    /// Read a grid drawn as text, one string per row. Live cells are `#` (or `O`), dead cells
    /// are `.`.
    pub fn from_rows(rows: &[&str], topology: Topology) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());

        let mut grid = Self::new(width, height, topology)?;

        for (y, row) in rows.iter().enumerate() {
            let got = row.chars().count();
            if got != width {
                return Err(GridError::RaggedRow {
                    row: y,
                    exp: width,
                    got,
                });
            }

            for (x, ch) in row.chars().enumerate() {
                grid.current[y * width + x] = match ch {
                    ALIVE | 'O' => true,
                    DEAD => false,
                    ch => return Err(GridError::InvalidCell { ch, row: y, col: x }),
                };
            }
        }

        grid.sync_next();

        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// State of the cell at column `x`, row `y` of the current generation. Coordinates outside
    /// the grid are resolved by the grid's [`Topology`].
    #[inline]
    pub fn get(&self, x: CellCoord, y: CellCoord) -> bool {
        let (Some(x), Some(y)) = (
            self.topology.resolve(x, self.width),
            self.topology.resolve(y, self.height),
        ) else {
            return false;
        };

        self.current[y * self.width + x]
    }

    /// Like [`Grid::get`], but only for in-range coordinates. Anything outside the grid is dead.
    #[inline]
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.current[y * self.width + x]
    }

    /// Write the state of a cell of the *next* generation. Nothing becomes visible until
    /// [`Grid::swap_generations`].
    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        assert!(x < self.width, "x is out of bounds");
        assert!(y < self.height, "y is out of bounds");

        self.next[y * self.width + x] = alive;
    }

    /// Publish the next generation. The previous generation becomes the scratch buffer for the
    /// following step.
    pub fn swap_generations(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Fill the current generation with independent coin flips, each cell alive with probability
    /// `live_probability`. The same `seed` always gives the same grid.
    pub fn randomize(&mut self, seed: u64, live_probability: f64) -> Result<(), GridError> {
        if !(0.0..=1.0).contains(&live_probability) {
            return Err(GridError::InvalidProbability(live_probability));
        }

        let mut rng = StdRng::seed_from_u64(seed);

        for cell in self.current.iter_mut() {
            *cell = rng.gen_bool(live_probability);
        }

        self.sync_next();

        debug!(seed, live_probability, population = self.population(), "randomized grid");

        Ok(())
    }

    /// Kill every cell.
    pub fn clear(&mut self) {
        self.current.fill(false);
        self.next.fill(false);
    }

    /// Number of live cells in the current generation.
    pub fn population(&self) -> usize {
        self.current.iter().filter(|&&c| c).count()
    }

    /// Coordinates of every live cell of the current generation, row by row.
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width;

        self.current
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(move |(i, _)| (i % w, i / w))
    }

    /// The current generation, row-major.
    pub fn cells(&self) -> &[bool] {
        &self.current
    }

    /// Split access for the transition: the current generation to read from, the next one to
    /// write into.
    pub(crate) fn buffers_mut(&mut self) -> (&[bool], &mut [bool]) {
        (&self.current, &mut self.next)
    }

    // The clipped topology never writes its border ring, so `next` must start out agreeing with
    // `current` whenever `current` is replaced wholesale.
    fn sync_next(&mut self) {
        self.next.copy_from_slice(&self.current);
    }
}

impl PartialEq for Grid {
    /// Grids compare by their published generation only.
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.topology == other.topology
            && self.current == other.current
    }
}

impl Eq for Grid {}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.current.chunks(self.width).enumerate() {
            if y > 0 {
                writeln!(f)?;
            }

            for &c in row {
                write!(f, "{}", if c { ALIVE } else { DEAD })?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{} ({})", self.width, self.height, self.topology)?;
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::Grid;
    use super::GridError;
    use crate::topology::Topology;

    #[test]
    fn too_small_for_torus() {
        let err = Grid::new(2, 5, Topology::Toroidal).unwrap_err();

        assert_eq!(
            err,
            GridError::TooSmall {
                width: 2,
                height: 5,
                topology: Topology::Toroidal,
                min: 3
            }
        );
    }

    #[test]
    fn empty_grid_rejected() {
        assert!(Grid::new(0, 4, Topology::Clipped).is_err());
        assert!(Grid::new(4, 0, Topology::Clipped).is_err());
        assert!(Grid::new(1, 1, Topology::Clipped).is_ok());
    }

    #[test]
    fn oversized_grid_rejected() {
        // width * height overflows usize
        assert_eq!(
            Grid::new(usize::MAX, 2, Topology::Toroidal).unwrap_err(),
            GridError::TooLarge {
                width: usize::MAX,
                height: 2
            }
        );

        // fits in usize, but not in a Vec
        let side = isize::MAX as usize;
        assert_eq!(
            Grid::new(side, 2, Topology::Clipped).unwrap_err(),
            GridError::TooLarge {
                width: side,
                height: 2
            }
        );
    }

    #[test]
    fn cells_are_row_major() {
        let grid = Grid::from_cells(3, 2, Topology::Clipped, [(2, 0), (0, 1)]).unwrap();

        assert_eq!(grid.cells(), [false, false, true, true, false, false]);
    }

    #[test]
    fn set_only_touches_next() {
        let mut grid = Grid::new(3, 3, Topology::Toroidal).unwrap();

        grid.set(1, 1, true);
        assert!(!grid.is_alive(1, 1));

        grid.swap_generations();
        assert!(grid.is_alive(1, 1));
    }

    #[test]
    #[should_panic(expected = "x is out of bounds")]
    fn set_out_of_bounds_panics() {
        let mut grid = Grid::new(3, 3, Topology::Toroidal).unwrap();

        grid.set(3, 0, true);
    }

    #[test]
    fn get_wraps_on_torus() {
        let grid = Grid::from_cells(4, 3, Topology::Toroidal, [(0, 0)]).unwrap();

        assert!(grid.get(4, 3));
        assert!(grid.get(-4, -3));
        assert!(!grid.get(-1, -1));
    }

    #[test]
    fn get_clips_outside() {
        let grid = Grid::from_cells(4, 3, Topology::Clipped, [(3, 2)]).unwrap();

        assert!(grid.get(3, 2));
        assert!(!grid.get(-1, -1));
        assert!(!grid.get(4, 3));
    }

    #[test]
    fn from_rows_parses_and_prints() {
        let rows = [".#.", "O..", "..#"];
        let grid = Grid::from_rows(&rows, Topology::Toroidal).unwrap();

        assert_eq!(grid.population(), 3);
        assert_eq!(grid.to_string(), ".#.\n#..\n..#");
        assert_eq!(grid.live_cells().collect::<Vec<_>>(), [(1, 0), (0, 1), (2, 2)]);
    }

    #[test]
    fn from_rows_errors() {
        assert_eq!(
            Grid::from_rows(&["...", "..", "..."], Topology::Toroidal).unwrap_err(),
            GridError::RaggedRow {
                row: 1,
                exp: 3,
                got: 2
            }
        );

        assert_eq!(
            Grid::from_rows(&["...", ".x.", "..."], Topology::Toroidal).unwrap_err(),
            GridError::InvalidCell {
                ch: 'x',
                row: 1,
                col: 1
            }
        );
    }

    #[test]
    fn from_cells_out_of_bounds() {
        let err = Grid::from_cells(3, 3, Topology::Toroidal, [(1, 3)]).unwrap_err();

        assert!(matches!(err, GridError::OutOfBounds { x: 1, y: 3, .. }));
    }

    #[test]
    fn randomize_is_reproducible() {
        let mut a = Grid::new(20, 10, Topology::Toroidal).unwrap();
        let mut b = Grid::new(20, 10, Topology::Toroidal).unwrap();

        a.randomize(42, 0.5).unwrap();
        b.randomize(42, 0.5).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn randomize_extremes() {
        let mut grid = Grid::new(8, 8, Topology::Toroidal).unwrap();

        grid.randomize(7, 0.0).unwrap();
        assert_eq!(grid.population(), 0);

        grid.randomize(7, 1.0).unwrap();
        assert_eq!(grid.population(), 64);
    }

    #[test]
    fn randomize_rejects_bad_probability() {
        let mut grid = Grid::new(3, 3, Topology::Toroidal).unwrap();

        assert_eq!(
            grid.randomize(1, 1.5).unwrap_err(),
            GridError::InvalidProbability(1.5)
        );
        assert!(grid.randomize(1, f64::NAN).is_err());
    }

    #[test]
    fn clear_kills_everything() {
        let mut grid = Grid::new(5, 5, Topology::Toroidal).unwrap();
        grid.randomize(3, 1.0).unwrap();

        grid.clear();
        grid.swap_generations();

        assert_eq!(grid.population(), 0);
    }
}
