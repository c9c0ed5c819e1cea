//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! A session must replay bit-for-bit from the same requests. The core
//! uses fixed-point math, walks units in sorted id order and draws wave
//! randomness from a seeded `ChaCha8Rng`. The helpers here replay a
//! session several times, on threads if asked, and compare final hashes.

use std::panic;
use std::thread;

use lane_core::simulation::Simulation;

/// Final state hashes from repeated runs of the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHashes {
    /// One hash per run, in run order.
    pub hashes: Vec<u64>,
    /// Ticks each run advanced.
    pub ticks: u64,
}

impl RunHashes {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn all_match(&self) -> bool {
        match self.hashes.split_first() {
            Some((first, rest)) => rest.iter().all(|hash| hash == first),
            None => true,
        }
    }

    /// Fail with every hash listed if any run ended elsewhere.
    ///
    /// # Panics
    ///
    /// When [`RunHashes::all_match`] is false.
    pub fn assert_deterministic(&self) {
        assert!(
            self.all_match(),
            "{} runs of {} ticks ended in different states: {:x?}",
            self.hashes.len(),
            self.ticks,
            self.hashes
        );
    }
}

/// Build a state `runs` times, advance each copy `ticks` steps and hash
/// the result.
///
/// ```
/// use lane_test_utils::determinism::verify_determinism;
/// use lane_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(
///     3,
///     200,
///     || skirmish(7),
///     |sim| {
///         sim.tick();
///     },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S>(
    runs: usize,
    ticks: u64,
    setup: impl Fn() -> S,
    step: impl Fn(&mut S),
    hash: impl Fn(&S) -> u64,
) -> RunHashes {
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();
    RunHashes { hashes, ticks }
}

/// Run a session twice and report whether both ended in the same state.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        setup_fn,
        |sim: &mut Simulation| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .all_match()
}

/// Run N sessions on scoped threads and collect final hashes.
///
/// Each session is built on its own thread, so the simulation itself
/// never crosses a thread boundary.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> RunHashes
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    });

    RunHashes {
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// `None` if the runs agree throughout, `Some(tick)` for the first tick
/// at which their hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for simulation inputs.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use lane_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate around the default grid.
    ///
    /// Range: -8 to 8 in steps of 1/8
    pub fn arb_fixed_coord() -> impl Strategy<Value = Fixed> {
        (-64i32..=64i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(8))
    }

    /// Generate a world position around the default grid.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_coord(), arb_fixed_coord()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate health values (1-1000).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..1000u32
    }

    /// Generate damage values (0-200), zero included.
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..200u32
    }

    /// Generate a cell on a `rows` x `cols` grid, sometimes just outside it.
    pub fn arb_cell(rows: u32, cols: u32) -> impl Strategy<Value = (u32, u32)> {
        (0..=rows, 0..=cols)
    }

    /// A request against the energy/gold ledger.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LedgerOp {
        /// Credit energy.
        AddEnergy(u32),
        /// Spend energy.
        SpendEnergy(u32),
        /// Credit gold.
        AddGold(u32),
        /// Spend gold.
        SpendGold(u32),
    }

    /// Generate a ledger request.
    pub fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            (0u32..200).prop_map(LedgerOp::AddEnergy),
            (0u32..200).prop_map(LedgerOp::SpendEnergy),
            (0u32..200).prop_map(LedgerOp::AddGold),
            (0u32..200).prop_map(LedgerOp::SpendGold),
        ]
    }

    /// A defender placement on the built-in catalog.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Placement {
        /// Catalog id.
        pub unit_type: &'static str,
        /// Row.
        pub row: u32,
        /// Column.
        pub col: u32,
    }

    /// Generate a placement of a built-in defender on the default grid.
    pub fn arb_placement() -> impl Strategy<Value = Placement> {
        (
            prop_oneof![Just("guard"), Just("shooter"), Just("energy_generator")],
            0u32..5,
            0u32..9,
        )
            .prop_map(|(unit_type, row, col)| Placement {
                unit_type,
                row,
                col,
            })
    }

    /// Generate a list of placements.
    pub fn arb_placements(max_len: usize) -> impl Strategy<Value = Vec<Placement>> {
        proptest::collection::vec(arb_placement(), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::arb_placements;
    use super::*;
    use crate::fixtures::{playing_session, skirmish, RUNNER, STRIKER};
    use lane_core::simulation::Simulation;
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.all_match());
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    #[should_panic(expected = "ended in different states")]
    fn test_mismatch_is_reported() {
        RunHashes {
            hashes: vec![1, 1, 2],
            ticks: 10,
        }
        .assert_deterministic();
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(Simulation::new, 100));
    }

    #[test]
    fn test_skirmish_determinism() {
        assert!(verify_simulation_determinism(|| skirmish(3), 1200));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        let divergence = find_first_divergence(
            || {
                let mut sim = playing_session();
                let _ = sim.spawn_attacker(STRIKER, 1);
                let _ = sim.spawn_attacker(RUNNER, 3);
                sim
            },
            300,
        );
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = verify_determinism(1, 600, || skirmish(1), |s| { s.tick(); }, |s| s.state_hash());
        let b = verify_determinism(1, 600, || skirmish(2), |s| { s.tick(); }, |s| s.state_hash());
        assert_ne!(a.hashes, b.hashes);
    }

    // =========================================================================
    // Parallel determinism tests
    // =========================================================================

    #[test]
    fn test_parallel_skirmishes_match() {
        let result = run_parallel_simulations_scoped(|| skirmish(11), 4, 800);
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    // =========================================================================
    // Property-based determinism tests
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_random_placements_are_deterministic(
            placements in arb_placements(12),
            seed in any::<u64>(),
        ) {
            let setup = || {
                let mut sim = skirmish(seed);
                for p in &placements {
                    let _ = sim.request_placement(p.unit_type, p.row, p.col);
                }
                sim
            };
            prop_assert!(verify_simulation_determinism(setup, 300));
        }
    }
}
