use proptest::prelude::*;

use lifegrid::engine::Counter;
use lifegrid::engine::Engine;
use lifegrid::grid::Grid;
use lifegrid::topology::Topology;

fn topology() -> impl Strategy<Value = Topology> {
    prop_oneof![Just(Topology::Toroidal), Just(Topology::Clipped)]
}

fn random_grid(w: usize, h: usize, topology: Topology, seed: u64, p: f64) -> Grid {
    let mut grid = Grid::new(w, h, topology).unwrap();
    grid.randomize(seed, p).unwrap();
    grid
}

proptest! {
    #[test]
    fn scalar_and_shifted_agree(
        w in 1usize..24,
        h in 1usize..24,
        topology in topology(),
        seed in any::<u64>(),
        p in 0.0f64..=1.0,
        steps in 1usize..8,
    ) {
        prop_assume!(w >= topology.min_side() && h >= topology.min_side());

        let grid = random_grid(w, h, topology, seed, p);
        let mut scalar = Engine::from_grid(grid.clone()).with_counter(Counter::Scalar);
        let mut shifted = Engine::from_grid(grid).with_counter(Counter::Shifted);

        for _ in 0..steps {
            scalar.advance();
            shifted.advance();

            prop_assert_eq!(scalar.grid(), shifted.grid());
        }
    }

    #[test]
    fn replays_are_identical(
        w in 3usize..20,
        h in 3usize..20,
        topology in topology(),
        seed in any::<u64>(),
    ) {
        let grid = random_grid(w, h, topology, seed, 0.5);

        let mut first = Engine::from_grid(grid.clone());
        let mut second = Engine::from_grid(grid);

        first.step(5);
        second.step(5);

        prop_assert_eq!(first.grid(), second.grid());
    }

    #[test]
    fn clipped_ring_never_changes(
        w in 1usize..16,
        h in 1usize..16,
        seed in any::<u64>(),
        steps in 1usize..6,
    ) {
        let start = random_grid(w, h, Topology::Clipped, seed, 0.5);
        let mut engine = Engine::from_grid(start.clone());

        let on_ring = |x: usize, y: usize| x == 0 || y == 0 || x == w - 1 || y == h - 1;

        for _ in 0..steps {
            engine.advance();

            for y in 0..h {
                for x in 0..w {
                    if on_ring(x, y) {
                        prop_assert_eq!(engine.is_alive(x, y), start.is_alive(x, y));
                    }
                }
            }
        }
    }

    #[test]
    fn next_generation_matches_rule(
        w in 3usize..16,
        h in 3usize..16,
        seed in any::<u64>(),
    ) {
        let grid = random_grid(w, h, Topology::Toroidal, seed, 0.4);
        let before = Engine::from_grid(grid.clone());
        let mut after = Engine::from_grid(grid);

        after.advance();

        for y in 0..h {
            for x in 0..w {
                let n = before.count_neighbors(x, y);
                let want = matches!((before.is_alive(x, y), n), (true, 2 | 3) | (false, 3));

                prop_assert_eq!(after.is_alive(x, y), want, "cell ({}, {})", x, y);
            }
        }
    }
}
