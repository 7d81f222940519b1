//! Lockstep replay checks.
//!
//! Peers only exchange orders, so two simulations fed the same orders
//! from the same seed must stay bit-identical. The helpers here replay a
//! setup several times, sequentially or on threads, and compare state
//! hashes, event streams and snapshots.
//!
//! Things that would break lockstep and how the core avoids them:
//!
//! - **Floats**: movers use [`terra_core::math::Fixed`].
//! - **Hash iteration order**: units and players live in `BTreeMap`s.
//! - **Ambient randomness**: every RNG is a `ChaCha8Rng` drawn from the
//!   world's master stream, itself seeded from the config.
//! - **Scheduling order**: executions tick in registration order and
//!   children are initialized in spawn order.

use std::thread;

use terra_core::simulation::{Simulation, WorldSnapshot};

/// Sorted, deduplicated copy of `hashes`.
fn distinct(hashes: &[u64]) -> Vec<u64> {
    let mut unique = hashes.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

fn all_equal(hashes: &[u64]) -> bool {
    hashes.windows(2).all(|pair| pair[0] == pair[1])
}

/// Final hashes of repeated sequential runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// True when every run ended on the same hash.
    pub is_deterministic: bool,
    /// Final hash of each run, in run order.
    pub hashes: Vec<u64>,
    /// Ticks per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// The different final hashes seen.
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        distinct(&self.hashes)
    }

    /// Panic with every hash listed unless all runs agreed.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic,
            "Simulation is non-deterministic: {} runs of {} ticks ended on {} different hashes {:?}",
            self.hashes.len(),
            self.ticks,
            self.unique_hashes().len(),
            self.hashes
        );
    }
}

/// Final hashes of simulations run side by side on threads.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final hash of each thread's simulation.
    pub hashes: Vec<u64>,
    /// Ticks per simulation.
    pub ticks: u64,
    /// Threads spawned.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Whether every thread ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        all_equal(&self.hashes)
    }

    /// Panic with every hash listed unless all threads agreed.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "Parallel simulations diverged: {} threads of {} ticks ended on {} different hashes {:?}",
            self.num_sims,
            self.ticks,
            distinct(&self.hashes).len(),
            self.hashes
        );
    }
}

/// Build `runs` states with `setup`, advance each `ticks` times with
/// `step` and compare the `hash` of each.
///
/// Generic over the state so the harness itself can be tested without a
/// simulation.
///
/// ```
/// use terra_test_utils::determinism::verify_determinism;
/// use terra_test_utils::fixtures::skirmish;
///
/// verify_determinism(3, 50, || skirmish(9), |sim| { sim.tick(); }, |sim| sim.state_hash())
///     .assert_deterministic();
/// ```
pub fn verify_determinism<S>(
    runs: usize,
    ticks: u64,
    setup: impl Fn() -> S,
    step: impl Fn(&mut S),
    hash: impl Fn(&S) -> u64,
) -> DeterminismResult {
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();

    DeterminismResult {
        is_deterministic: all_equal(&hashes),
        hashes,
        ticks,
    }
}

/// Two runs of `setup` for `ticks` ticks end on the same state hash.
pub fn verify_simulation_determinism(setup: impl Fn() -> Simulation, ticks: u64) -> bool {
    let step = |sim: &mut Simulation| {
        sim.tick();
    };
    verify_determinism(2, ticks, setup, step, Simulation::state_hash).is_deterministic
}

/// Run `num_sims` copies of `setup` on scoped threads.
///
/// A panicking simulation thread re-raises its panic here.
///
/// ```
/// use terra_test_utils::determinism::run_parallel_simulations_scoped;
/// use terra_test_utils::fixtures::skirmish;
///
/// run_parallel_simulations_scoped(|| skirmish(5), 4, 40).assert_deterministic();
/// ```
pub fn run_parallel_simulations_scoped(
    setup: impl Fn() -> Simulation + Sync,
    num_sims: usize,
    ticks: u64,
) -> ParallelSimResult {
    let setup = &setup;
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                scope.spawn(move || {
                    let mut sim = setup();
                    sim.run(ticks);
                    sim.state_hash()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks,
        num_sims,
    }
}

/// Step two copies of `setup` together and report the first tick whose
/// events or resulting state differ.
///
/// Returns `Some(0)` if the setups already differ before any tick.
pub fn find_first_divergence(setup: impl Fn() -> Simulation, ticks: u64) -> Option<u64> {
    let (mut a, mut b) = (setup(), setup());
    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    (1..=ticks).find(|&tick| {
        let diverged = a.tick() != b.tick() || a.state_hash() != b.state_hash();
        if diverged {
            tracing::warn!(tick, "simulations diverged");
        }
        diverged
    })
}

/// Advance `setup` by `ticks`, encode a snapshot and decode it again.
///
/// True when the decoded snapshot equals the live state and hashes the
/// same.
pub fn verify_serialization_determinism(setup: impl Fn() -> Simulation, ticks: u64) -> bool {
    let mut sim = setup();
    sim.run(ticks);

    let live = sim.snapshot_state();
    sim.snapshot()
        .and_then(|bytes| WorldSnapshot::decode(&bytes))
        .is_ok_and(|restored| restored.state_hash() == sim.state_hash() && restored == live)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;
    use terra_core::map::GridMap;
    use terra_core::pathfinding::SearchLimits;

    /// Generate a master seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate lattice coordinates inside a `width` x `height` map.
    pub fn arb_coord(width: u32, height: u32) -> impl Strategy<Value = (u32, u32)> {
        (0..width, 0..height)
    }

    /// Generate search budgets, from starved to generous.
    pub fn arb_search_limits() -> impl Strategy<Value = SearchLimits> {
        (1u32..500, 1u32..60).prop_map(|(iterations_per_call, max_tries)| SearchLimits {
            iterations_per_call,
            max_tries,
        })
    }

    /// Generate a map with mostly water and scattered islands and ridges.
    pub fn arb_grid_map(width: usize, height: usize) -> impl Strategy<Value = GridMap> {
        let symbol = prop_oneof![
            6 => Just('~'),
            1 => Just('o'),
            2 => Just('#'),
            1 => Just('h'),
            1 => Just('^'),
        ];
        proptest::collection::vec(proptest::collection::vec(symbol, width), height).prop_map(
            |rows| {
                let rows: Vec<String> = rows.into_iter().map(|r| r.into_iter().collect()).collect();
                match GridMap::from_ascii(&rows) {
                    Ok(map) => map,
                    Err(e) => panic!("generated map rejected: {e}"),
                }
            },
        )
    }
}
