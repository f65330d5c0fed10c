use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;
use tracing::trace;

use crate::CellCoord;
use crate::config::Config;
use crate::config::ConfigError;
use crate::config::DEFAULT_LIVE_PROBABILITY;
use crate::grid::Grid;
use crate::grid::GridError;
use crate::rule_set::B3S23;
use crate::rule_set::RuleSet;
use crate::topology::Topology;

/// Offsets of the Moore neighborhood, row by row.
const NEIGHBORHOOD: [(CellCoord, CellCoord); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Strategy used to count the live neighbors of every cell. Both give the exact same generations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Look up the 8 neighbors of each cell one at a time.
    Scalar,

    /// Add up 8 shifted copies of the whole grid, one per neighbor offset.
    #[default]
    Shifted,
}

#[derive(Debug, Error)]
#[error("Unknown counter \"{0}\", expected \"shifted\" or \"scalar\"")]
pub struct CounterError(String);

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::Scalar => write!(f, "scalar"),
            Counter::Shifted => write!(f, "shifted"),
        }
    }
}

impl FromStr for Counter {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Counter::Scalar),
            "shifted" => Ok(Counter::Shifted),
            _ => Err(CounterError(s.to_string())),
        }
    }
}

/// Steps a [`Grid`] forward one generation at a time under [`B3S23`].
///
/// A step reads only the published generation and writes only the next one, so the order in
/// which cells get visited never matters. The new generation becomes visible all at once when the
/// step ends.
#[derive(Debug)]
pub struct Engine {
    grid: Grid,
    rules: RuleSet,
    counter: Counter,

    /// Neighbor counts, reused across steps by [`Counter::Shifted`]
    counts: Vec<u8>,

    /// Number of completed steps
    generation: u64,

    /// Seed of the current initial state, if it was randomized
    seed: Option<u64>,
}

impl Engine {
    /// Create a `width` by `height` grid, seeded from `seed` with each cell alive with probability
    /// [`DEFAULT_LIVE_PROBABILITY`].
    pub fn new(
        width: usize,
        height: usize,
        topology: Topology,
        seed: u64,
    ) -> Result<Self, GridError> {
        let mut grid = Grid::new(width, height, topology)?;
        grid.randomize(seed, DEFAULT_LIVE_PROBABILITY)?;

        Ok(Self {
            seed: Some(seed),
            ..Self::from_grid(grid)
        })
    }

    /// Build the engine described by `config`. Without a configured seed, a random one is drawn;
    /// [`Engine::seed`] reports it either way.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let (width, height) = config.grid_dimensions()?;
        let seed = config.seed.unwrap_or_else(rand::random);

        let mut grid = Grid::new(width, height, config.topology)?;
        grid.randomize(seed, config.live_probability)?;

        info!(
            width,
            height,
            topology = %config.topology,
            counter = %config.counter,
            seed,
            population = grid.population(),
            "created grid"
        );

        Ok(Self {
            seed: Some(seed),
            ..Self::from_grid(grid)
        }
        .with_counter(config.counter))
    }

    /// Take over an existing grid as generation `0`.
    pub fn from_grid(grid: Grid) -> Self {
        let counts = vec![0; grid.width() * grid.height()];

        Self {
            grid,
            rules: B3S23,
            counter: Counter::default(),
            counts,
            generation: 0,
            seed: None,
        }
    }

    pub fn with_counter(mut self, counter: Counter) -> Self {
        self.counter = counter;
        self
    }

    /// Replace the current state with a fresh random one and restart the generation count.
    pub fn reseed(&mut self, seed: u64, live_probability: f64) -> Result<(), GridError> {
        self.grid.randomize(seed, live_probability)?;
        self.generation = 0;
        self.seed = Some(seed);

        Ok(())
    }

    /// Compute the next generation and publish it.
    pub fn advance(&mut self) {
        self.freeze_border();

        match self.counter {
            Counter::Scalar => self.advance_scalar(),
            Counter::Shifted => self.advance_shifted(),
        }

        self.grid.swap_generations();
        self.generation += 1;

        trace!(
            generation = self.generation,
            population = self.grid.population(),
            "advanced"
        );
    }

    /// Advance `n` generations.
    pub fn step(&mut self, n: u64) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Number of live neighbors of cell `(x, y)` in the current generation.
    pub fn count_neighbors(&self, x: usize, y: usize) -> u8 {
        let (x, y) = (x as CellCoord, y as CellCoord);

        NEIGHBORHOOD
            .iter()
            .filter(|&&(dx, dy)| self.grid.get(x + dx, y + dy))
            .count() as u8
    }

    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.grid.is_alive(x, y)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    pub fn counter(&self) -> Counter {
        self.counter
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn population(&self) -> usize {
        self.grid.population()
    }

    /// Copy every cell the scan skips straight into the next generation, so that the next
    /// generation is complete before it's published. On a clipped grid the skipped cells are the
    /// frozen outer ring.
    fn freeze_border(&mut self) {
        let topology = self.grid.topology();
        if !topology.has_frozen_border() {
            return;
        }

        let (w, h) = (self.grid.width(), self.grid.height());
        let (xs, ys) = (topology.scan(w), topology.scan(h));

        let (current, next) = self.grid.buffers_mut();

        for y in 0..h {
            let row = y * w..(y + 1) * w;

            if !ys.contains(&y) {
                next[row.clone()].copy_from_slice(&current[row]);
                continue;
            }

            // left and right edge of an interior row
            for x in (0..xs.start).chain(xs.end..w) {
                next[y * w + x] = current[y * w + x];
            }
        }
    }

    fn advance_scalar(&mut self) {
        let topology = self.grid.topology();
        let xs = topology.scan(self.grid.width());
        let ys = topology.scan(self.grid.height());

        for y in ys {
            for x in xs.clone() {
                let n = self.count_neighbors(x, y);
                let alive = self.rules.next_state(self.grid.is_alive(x, y), n);

                self.grid.set(x, y, alive);
            }
        }
    }

    fn advance_shifted(&mut self) {
        let (w, h) = (self.grid.width(), self.grid.height());
        let topology = self.grid.topology();
        let (xs, ys) = (topology.scan(w), topology.scan(h));
        let rules = self.rules;

        let counts = self.counts.as_mut_slice();
        let (current, next) = self.grid.buffers_mut();

        counts.fill(0);
        for (dx, dy) in NEIGHBORHOOD {
            add_shifted(counts, current, w, h, dx, dy);
        }

        // On a clipped grid the interior never reaches past the edge, so the wrapped reads above
        // only ever land on cells that get skipped here.
        for y in ys {
            for x in xs.clone() {
                let i = y * w + x;
                next[i] = rules.next_state(current[i], counts[i]);
            }
        }
    }
}

/// For every cell `(x, y)`, add the state of cell `(x + dx, y + dy)` to its count, wrapping
/// around the edges.
fn add_shifted(
    counts: &mut [u8],
    cells: &[bool],
    w: usize,
    h: usize,
    dx: CellCoord,
    dy: CellCoord,
) {
    let sx = dx.rem_euclid(w as CellCoord) as usize;

    for y in 0..h {
        let sy = (y as CellCoord + dy).rem_euclid(h as CellCoord) as usize;

        let src = &cells[sy * w..(sy + 1) * w];
        let dst = &mut counts[y * w..(y + 1) * w];

        // dst[x] reads src[x + sx] until the source runs off the end of the row, then wraps
        let (head, tail) = dst.split_at_mut(w - sx);

        for (d, &s) in head.iter_mut().zip(&src[sx..]) {
            *d += s as u8;
        }

        for (d, &s) in tail.iter_mut().zip(&src[..sx]) {
            *d += s as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Counter;
    use super::Engine;
    use crate::grid::Grid;
    use crate::rule_set::B3S23;
    use crate::topology::Topology;

    const COUNTERS: [Counter; 2] = [Counter::Scalar, Counter::Shifted];

    /// A 3x3 clipped grid whose centre is `alive`, surrounded by `n` live neighbors.
    fn neighborhood(alive: bool, n: usize) -> Grid {
        let ring = [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)];

        let mut live: Vec<_> = ring.into_iter().take(n).collect();
        if alive {
            live.push((1, 1));
        }

        Grid::from_cells(3, 3, Topology::Clipped, live).unwrap()
    }

    #[test]
    fn rule_table() {
        for counter in COUNTERS {
            for alive in [false, true] {
                for n in 0..=8 {
                    let mut engine = Engine::from_grid(neighborhood(alive, n)).with_counter(counter);

                    assert_eq!(engine.count_neighbors(1, 1), n as u8);

                    engine.advance();

                    let want = matches!((alive, n), (true, 2 | 3) | (false, 3));
                    assert_eq!(
                        engine.is_alive(1, 1),
                        want,
                        "{counter}: alive={alive} with {n} neighbors"
                    );
                }
            }
        }
    }

    #[test]
    fn corners_are_neighbors_on_torus() {
        let grid = Grid::from_cells(5, 4, Topology::Toroidal, [(0, 0)]).unwrap();
        let engine = Engine::from_grid(grid);

        assert_eq!(engine.count_neighbors(4, 3), 1);
        assert_eq!(engine.count_neighbors(4, 0), 1);
        assert_eq!(engine.count_neighbors(0, 3), 1);
        assert_eq!(engine.count_neighbors(2, 2), 0);
    }

    #[test]
    fn corners_are_strangers_when_clipped() {
        let grid = Grid::from_cells(5, 4, Topology::Clipped, [(0, 0)]).unwrap();
        let engine = Engine::from_grid(grid);

        assert_eq!(engine.count_neighbors(4, 3), 0);
        assert_eq!(engine.count_neighbors(1, 1), 1);
    }

    #[test]
    fn generation_counts_steps() {
        let mut engine = Engine::new(6, 6, Topology::Toroidal, 9).unwrap();

        engine.step(5);
        assert_eq!(engine.generation(), 5);

        engine.reseed(10, 0.3).unwrap();
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.seed(), Some(10));
    }

    #[test]
    fn new_is_seeded() {
        let a = Engine::new(16, 16, Topology::Toroidal, 1234).unwrap();
        let b = Engine::new(16, 16, Topology::Toroidal, 1234).unwrap();

        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.seed(), Some(1234));
    }

    #[test]
    fn glider_wraps_around() {
        let rows = [
            ".#....",
            "..#...",
            "###...",
            "......",
            "......",
            "......",
        ];

        for counter in COUNTERS {
            let start = Grid::from_rows(&rows, Topology::Toroidal).unwrap();
            let mut engine = Engine::from_grid(start.clone()).with_counter(counter);

            // a glider moves one cell diagonally every 4 generations, so 24 brings it home
            engine.step(24);

            assert_eq!(engine.grid(), &start, "{counter}");
        }
    }

    #[test]
    fn uses_b3s23() {
        let engine = Engine::new(4, 4, Topology::Toroidal, 0).unwrap();

        assert_eq!(engine.rules(), B3S23);
    }

    #[test]
    fn narrow_clipped_grid_is_all_border() {
        // columns 0 and 1 are both edges, so the interior rows have nothing to compute
        let rows = ["##", ".#", "#.", "##", ".."];

        for counter in COUNTERS {
            let start = Grid::from_rows(&rows, Topology::Clipped).unwrap();
            let mut engine = Engine::from_grid(start.clone()).with_counter(counter);

            engine.step(3);

            assert_eq!(engine.grid(), &start, "{counter}");
        }
    }

    #[test]
    fn parse_counter() {
        assert_eq!("Scalar".parse::<Counter>().unwrap(), Counter::Scalar);
        assert_eq!("shifted".parse::<Counter>().unwrap(), Counter::Shifted);
        assert!("simd".parse::<Counter>().is_err());
    }
}
