//! Property tests for the core invariants.

use lane_core::components::{Faction, Health};
use lane_core::economy::{EconomyConfig, ResourceLedger};
use lane_core::grid::{CellState, GridField, GridLayout};
use lane_core::simulation::Simulation;
use lane_test_utils::determinism::strategies::{
    arb_cell, arb_damage, arb_health, arb_ledger_op, arb_placements, arb_vec2_position, LedgerOp,
};
use lane_test_utils::fixtures::skirmish;
use proptest::prelude::*;

fn assert_roster_invariants(sim: &Simulation) -> Result<(), TestCaseError> {
    for unit in sim.units().iter() {
        prop_assert!(unit.health.current <= unit.health.max);
        prop_assert_eq!(unit.is_alive(), unit.health.current > 0);
        if unit.faction == Faction::Defender {
            prop_assert!(unit.cell.is_some());
        }
    }
    prop_assert!(sim.battlefield().is_consistent());
    prop_assert!(sim.projectiles().iter().all(|p| !p.has_hit()));
    Ok(())
}

proptest! {
    #[test]
    fn health_stays_in_bounds(
        max in arb_health(),
        hits in proptest::collection::vec((arb_damage(), any::<bool>()), 0..40),
    ) {
        let mut health = Health::new(max);
        for (amount, is_heal) in hits {
            let was_dead = health.is_dead();
            if is_heal {
                health.heal(amount);
            } else {
                health.apply_damage(amount);
            }
            prop_assert!(health.current <= health.max);
            prop_assert_eq!(health.max, max);
            if was_dead {
                prop_assert!(health.is_dead());
            }
        }
    }

    #[test]
    fn ledger_never_partially_spends(ops in proptest::collection::vec(arb_ledger_op(), 0..60)) {
        let mut ledger = ResourceLedger::new(EconomyConfig::default());
        let (mut energy, mut gold) = (ledger.energy(), ledger.gold());

        for op in ops {
            match op {
                LedgerOp::AddEnergy(n) => {
                    ledger.add_energy(n);
                    energy = energy.saturating_add(n);
                }
                LedgerOp::AddGold(n) => {
                    ledger.add_gold(n);
                    gold = gold.saturating_add(n);
                }
                LedgerOp::SpendEnergy(n) => {
                    let ok = ledger.spend_energy(n).is_ok();
                    prop_assert_eq!(ok, n <= energy);
                    if ok {
                        energy -= n;
                    }
                }
                LedgerOp::SpendGold(n) => {
                    let ok = ledger.spend_gold(n).is_ok();
                    prop_assert_eq!(ok, n <= gold);
                    if ok {
                        gold -= n;
                    }
                }
            }
            prop_assert_eq!(ledger.energy(), energy);
            prop_assert_eq!(ledger.gold(), gold);
        }
    }

    #[test]
    fn occupied_cells_reject_second_claim((row, col) in arb_cell(5, 9)) {
        let mut grid = GridField::new(GridLayout::default());
        let first = grid.try_occupy(row, col, 1);
        prop_assert_eq!(first, grid.contains(row, col));

        prop_assert!(!grid.try_occupy(row, col, 2));
        if first {
            prop_assert_eq!(grid.cell(row, col), Some(CellState::Occupied(1)));
        }
    }

    #[test]
    fn free_is_idempotent((row, col) in arb_cell(5, 9)) {
        let mut grid = GridField::new(GridLayout::default());
        grid.try_occupy(row, col, 7);

        grid.free(row, col);
        let once = grid.clone();
        grid.free(row, col);
        prop_assert_eq!(grid, once);
    }

    #[test]
    fn world_to_grid_round_trips_through_centers(position in arb_vec2_position()) {
        let grid = GridField::new(GridLayout::default());
        if let Some(coord) = grid.world_to_grid(position) {
            let center = grid.cell_center(coord);
            prop_assert!(center.is_some());
            prop_assert_eq!(center.and_then(|c| grid.world_to_grid(c)), Some(coord));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn battlefield_invariants_hold_every_tick(
        placements in arb_placements(10),
        seed in any::<u64>(),
    ) {
        let mut sim = skirmish(seed);
        for p in &placements {
            let _ = sim.request_placement(p.unit_type, p.row, p.col);
        }
        assert_roster_invariants(&sim)?;

        for _ in 0..600 {
            let tick = sim.tick();
            for hit in &tick.damage_events {
                prop_assert!(hit.amount > 0);
            }
            assert_roster_invariants(&sim)?;
            if sim.state().is_terminal() {
                break;
            }
        }
    }

    #[test]
    fn failed_placement_changes_nothing(
        placements in arb_placements(20),
    ) {
        let mut sim = skirmish(5);
        for p in &placements {
            let before = sim.state_hash();
            let energy = sim.ledger().energy();
            if sim.request_placement(p.unit_type, p.row, p.col).is_err() {
                prop_assert_eq!(sim.state_hash(), before);
                prop_assert_eq!(sim.ledger().energy(), energy);
            }
        }
    }
}
