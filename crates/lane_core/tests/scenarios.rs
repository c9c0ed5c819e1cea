//! End-to-end combat scenarios.
//!
//! Each test drives a full session through the public API and checks the
//! observable outcome: health sequences, cell occupancy, ledger balances
//! and game state changes.

use std::cell::RefCell;
use std::rc::Rc;

use lane_core::components::{Faction, MovementState, UnitStats};
use lane_core::config::SessionConfig;
use lane_core::data::{UnitCatalog, UnitData};
use lane_core::economy::{EconomyConfig, ResourceLedger};
use lane_core::error::GameError;
use lane_core::events::SimEvent;
use lane_core::grid::{GridField, GridLayout};
use lane_core::math::{Fixed, Vec2Fixed};
use lane_core::registry::UnitRegistry;
use lane_core::simulation::Simulation;
use lane_core::state::{GameState, Signal};
use lane_core::targeting;
use lane_test_utils::fixtures::{
    attacker_stats, fixed, playing_session, test_catalog, RUNNER, SNIPER, STRIKER, TURRET, WALL,
};

fn record_events(sim: &mut Simulation) -> Rc<RefCell<Vec<SimEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sim.subscribe(move |event: &SimEvent| sink.borrow_mut().push(*event));
    seen
}

// =============================================================================
// Scenario A: melee attacker grinds down a defender
// =============================================================================

#[test]
fn melee_attacker_destroys_defender_and_frees_cell() {
    let mut sim = playing_session();
    let seen = record_events(&mut sim);

    let wall = sim.request_placement(WALL, 2, 4).unwrap();
    let striker = sim.spawn_attacker(STRIKER, 2).unwrap();
    assert!(!sim.grid().is_empty(2, 4));

    // Walk ~6 units then five one-second attack cycles.
    for _ in 0..(32 * 15) {
        sim.tick();
    }

    let health: Vec<u32> = seen
        .borrow()
        .iter()
        .filter_map(|event| match event {
            SimEvent::HealthChanged { unit, current, .. } if *unit == wall => Some(*current),
            _ => None,
        })
        .collect();
    assert_eq!(health, vec![80, 60, 40, 20, 0]);

    assert!(sim.unit(wall).is_none());
    assert!(sim.grid().is_empty(2, 4));
    assert!(seen.borrow().contains(&SimEvent::UnitDied {
        unit: wall,
        faction: Faction::Defender,
    }));
    // The attacker resumes walking once its blocker is gone.
    assert!(sim.unit(striker).is_some_and(|u| u.position.x < fixed(0)));
}

#[test]
fn attacker_holds_position_while_engaged() {
    let mut sim = playing_session();
    sim.request_placement(WALL, 1, 8).unwrap();
    let striker = sim.spawn_attacker(STRIKER, 1).unwrap();

    for _ in 0..(32 * 3) {
        sim.tick();
    }
    let held = sim.unit(striker).unwrap().position.x;
    sim.tick();
    assert_eq!(sim.unit(striker).unwrap().position.x, held);
}

// =============================================================================
// Scenario B: ledger spends are all-or-nothing
// =============================================================================

#[test]
fn ledger_spend_is_all_or_nothing() {
    let mut ledger = ResourceLedger::new(EconomyConfig::default());
    assert_eq!(ledger.energy(), 50);

    assert!(ledger.spend_energy(50).is_ok());
    assert_eq!(ledger.energy(), 0);

    let err = ledger.spend_energy(10).unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientResources {
            required: 10,
            available: 0,
            ..
        }
    ));
    assert_eq!(ledger.energy(), 0);
}

// =============================================================================
// Scenario C: an unopposed attacker breaches after exactly 12 seconds
// =============================================================================

#[test]
fn unopposed_attacker_breaches_once() {
    let mut sim = playing_session();
    let seen = record_events(&mut sim);
    let runner = sim.spawn_attacker(RUNNER, 0).unwrap();
    assert_eq!(sim.unit(runner).unwrap().position.x, fixed(6));

    for _ in 0..383 {
        sim.tick();
    }
    assert_eq!(sim.state(), GameState::Playing);
    assert!(sim.unit(runner).is_some());

    let breach_tick = sim.tick();
    assert_eq!(breach_tick.tick, 384);
    assert_eq!(breach_tick.state_change(), Some(GameState::Defeat));
    assert!(breach_tick
        .events
        .contains(&SimEvent::BaseBreached { unit: runner, lane: 0 }));
    assert!(sim.unit(runner).is_none());

    let frozen = sim.state_hash();
    for _ in 0..100 {
        assert!(sim.tick().events.is_empty());
    }
    assert_eq!(sim.state_hash(), frozen);
    assert_eq!(sim.get_tick(), 384);

    let defeats = seen
        .borrow()
        .iter()
        .filter(|event| {
            matches!(
                event,
                SimEvent::GameStateChanged {
                    state: GameState::Defeat
                }
            )
        })
        .count();
    assert_eq!(defeats, 1);
}

// =============================================================================
// Scenario D: equal-distance targets resolve to the lower id
// =============================================================================

#[test]
fn equal_distance_tie_goes_to_lower_id() {
    let mut grid = GridField::new(GridLayout::default());
    let mut units = UnitRegistry::new();
    let defender = units
        .spawn_defender(&mut grid, WALL, attacker_stats(100, 0, Fixed::ZERO), 2, 4)
        .unwrap();
    let center = units.get(defender).unwrap().position.x;

    let behind = units
        .spawn_attacker(&grid, RUNNER, attacker_stats(50, 5, fixed(1)), 2, center - fixed(2))
        .unwrap();
    let ahead = units
        .spawn_attacker(&grid, RUNNER, attacker_stats(50, 5, fixed(1)), 2, center + fixed(2))
        .unwrap();
    assert!(behind < ahead);

    let seeker = units.get(defender).unwrap();
    assert_eq!(targeting::find_target(&units, seeker), Some(behind));
}

// =============================================================================
// Projectiles
// =============================================================================

#[test]
fn ballistic_turret_kills_runner_for_no_reward() {
    let mut sim = playing_session();
    let seen = record_events(&mut sim);
    sim.request_placement(TURRET, 3, 0).unwrap();
    let runner = sim.spawn_attacker(RUNNER, 3).unwrap();

    for _ in 0..(32 * 8) {
        sim.tick();
    }

    assert!(sim.unit(runner).is_none());
    assert_eq!(sim.state(), GameState::Playing);
    let hits = seen
        .borrow()
        .iter()
        .filter(|event| matches!(event, SimEvent::HealthChanged { unit, .. } if *unit == runner))
        .count();
    assert_eq!(hits, 5);
    assert_eq!(sim.ledger().gold(), 0);
}

#[test]
fn homing_projectiles_despawn_when_target_dies() {
    let mut sim = playing_session();
    sim.request_placement(SNIPER, 0, 0).unwrap();
    sim.request_placement(SNIPER, 0, 1).unwrap();
    let runner = sim.spawn_attacker(RUNNER, 0).unwrap();

    let mut damage_to_runner = 0u32;
    for _ in 0..(32 * 10) {
        let tick = sim.tick();
        damage_to_runner += tick
            .damage_events
            .iter()
            .filter(|hit| hit.target == runner)
            .map(|hit| hit.amount)
            .sum::<u32>();
        assert!(sim.projectiles().iter().all(|p| !p.has_hit()));
    }

    assert!(sim.unit(runner).is_none());
    assert_eq!(damage_to_runner, 50);
    assert!(sim.projectiles().is_empty());
}

#[test]
fn archer_halts_at_range_and_shoots_guard_down() {
    let mut sim = Simulation::with_config(SessionConfig::default(), UnitCatalog::builtin()).unwrap();
    sim.request_state_transition(Signal::Start).unwrap();
    let seen = record_events(&mut sim);

    let guard = sim.request_placement("guard", 2, 4).unwrap();
    let archer = sim.spawn_attacker("archer", 2).unwrap();

    for _ in 0..(32 * 6) {
        sim.tick();
    }
    let halted = sim.unit(archer).unwrap();
    assert_eq!(halted.movement, MovementState::Engaged);
    assert_eq!(halted.position.x, fixed(3));

    for _ in 0..(32 * 24) {
        sim.tick();
    }

    let health: Vec<u32> = seen
        .borrow()
        .iter()
        .filter_map(|event| match event {
            SimEvent::HealthChanged { unit, current, .. } if *unit == guard => Some(*current),
            _ => None,
        })
        .collect();
    let expected: Vec<u32> = (1..=19).map(|hit| 150u32.saturating_sub(8 * hit)).collect();
    assert_eq!(health, expected);

    assert!(sim.unit(guard).is_none());
    assert!(sim.grid().is_empty(2, 4));
    assert!(sim.unit(archer).is_some_and(|u| u.position.x < fixed(3)));
}

#[test]
fn striker_kill_credits_gold() {
    let mut sim = playing_session();
    sim.request_placement(TURRET, 4, 0).unwrap();
    let striker = sim.spawn_attacker(STRIKER, 4).unwrap();

    for _ in 0..(32 * 12) {
        sim.tick();
    }
    assert!(sim.unit(striker).is_none());
    assert_eq!(sim.ledger().gold(), 5);
}

// =============================================================================
// State machine through the session
// =============================================================================

#[test]
fn pause_freezes_everything() {
    let mut sim = playing_session();
    let runner = sim.spawn_attacker(RUNNER, 2).unwrap();
    for _ in 0..10 {
        sim.tick();
    }
    sim.request_state_transition(Signal::Pause).unwrap();
    let position = sim.unit(runner).unwrap().position;
    let energy = sim.ledger().energy();
    let timer = sim.ledger().accrual_timer();

    for _ in 0..200 {
        sim.tick();
    }
    assert_eq!(sim.unit(runner).unwrap().position, position);
    assert_eq!(sim.ledger().energy(), energy);
    assert_eq!(sim.ledger().accrual_timer(), timer);

    sim.request_state_transition(Signal::Resume).unwrap();
    sim.tick();
    assert!(sim.unit(runner).unwrap().position.x < position.x);
}

#[test]
fn restart_after_defeat_gives_clean_session() {
    let mut sim = playing_session();
    sim.request_placement(WALL, 0, 0).unwrap();
    sim.spawn_attacker(RUNNER, 4).unwrap();
    for _ in 0..400 {
        sim.tick();
    }
    assert_eq!(sim.state(), GameState::Defeat);
    assert!(sim.request_state_transition(Signal::Pause).is_err());

    assert_eq!(
        sim.request_state_transition(Signal::Restart),
        Ok(GameState::Preparing)
    );
    assert!(sim.units().is_empty());
    assert!(sim.grid().is_empty(0, 0));
    assert!(sim.projectiles().is_empty());
    assert_eq!(sim.ledger().energy(), 50);
    assert_eq!(sim.ledger().gold(), 0);
}

#[test]
fn oversized_values_are_rejected_before_the_session_runs() {
    let mut config = SessionConfig::default();
    config.tick_rate = 3_000_000_000;
    assert!(matches!(
        Simulation::with_config(config, UnitCatalog::builtin()),
        Err(GameError::InvalidConfig(_))
    ));

    let mut catalog = test_catalog();
    let long_reach = UnitData::new(
        "long_reach",
        Faction::Defender,
        UnitStats::melee(100, 10).with_range(fixed(50_000)),
    );
    assert!(catalog.insert(long_reach).is_err());
    assert!(!catalog.contains("long_reach"));
}

#[test]
fn world_to_grid_matches_cell_centers() {
    let sim = Simulation::with_config(Default::default(), test_catalog()).unwrap();
    let grid = sim.grid();
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let center = grid
                .cell_center(lane_core::grid::GridCoord::new(row, col))
                .unwrap();
            let coord = sim.world_to_grid(center).unwrap();
            assert_eq!((coord.row, coord.col), (row, col));
        }
    }
    assert!(sim
        .world_to_grid(Vec2Fixed::new(fixed(100), fixed(0)))
        .is_none());
}
