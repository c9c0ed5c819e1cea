//! Test fixtures and helpers.
//!
//! Small catalogs with round numbers and pre-built sessions for
//! consistent testing.

use fixed::types::I32F32;
use lane_core::components::{Faction, Guidance, ProjectileSpec, UnitStats};
use lane_core::config::SessionConfig;
use lane_core::data::{UnitCatalog, UnitData};
use lane_core::simulation::Simulation;
use lane_core::state::Signal;
use lane_core::waves::{WavePlan, WaveSpec};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Free defender that never attacks.
pub const WALL: &str = "wall";
/// Free defender firing ballistic projectiles down its lane.
pub const TURRET: &str = "turret";
/// Free defender firing homing projectiles.
pub const SNIPER: &str = "sniper";
/// Melee attacker: 100 hp, 20 damage per second, range 1, speed 1.
pub const STRIKER: &str = "striker";
/// Attacker that never attacks and walks at speed 1.
pub const RUNNER: &str = "runner";

/// Catalog of zero-cost test units with easy numbers.
///
/// | id        | side     | hp  | attack                      | speed |
/// |-----------|----------|-----|-----------------------------|-------|
/// | `wall`    | defender | 100 | none                        | -     |
/// | `turret`  | defender | 100 | ballistic, 10 dmg, range 20 | -     |
/// | `sniper`  | defender | 100 | homing, 10 dmg, range 20    | -     |
/// | `striker` | attacker | 100 | melee, 20 dmg, range 1      | 1     |
/// | `runner`  | attacker | 50  | none                        | 1     |
#[must_use]
pub fn test_catalog() -> UnitCatalog {
    let ranged = |guidance| {
        UnitStats::melee(100, 10)
            .with_projectile(ProjectileSpec {
                guidance,
                ..ProjectileSpec::default()
            })
            .with_range(fixed(20))
    };
    let units = [
        UnitData::new(WALL, Faction::Defender, UnitStats::passive(100)),
        UnitData::new(TURRET, Faction::Defender, ranged(Guidance::Ballistic)),
        UnitData::new(SNIPER, Faction::Defender, ranged(Guidance::Homing)),
        UnitData::new(
            STRIKER,
            Faction::Attacker,
            UnitStats::melee(100, 20)
                .with_move_speed(fixed(1))
                .with_gold_reward(5),
        ),
        UnitData::new(
            RUNNER,
            Faction::Attacker,
            UnitStats::passive(50).with_move_speed(fixed(1)),
        ),
    ];
    match UnitCatalog::from_units(units) {
        Ok(catalog) => catalog,
        Err(error) => panic!("test catalog is invalid: {error}"),
    }
}

/// Stats for an attacker with the given melee profile.
#[must_use]
pub fn attacker_stats(health: u32, damage: u32, speed: I32F32) -> UnitStats {
    UnitStats::melee(health, damage).with_move_speed(speed)
}

/// Session with the given catalog and waves, default everything else.
///
/// # Panics
///
/// Panics if the plan does not validate against the catalog.
#[must_use]
pub fn session(catalog: UnitCatalog, waves: WavePlan) -> Simulation {
    let config = SessionConfig {
        waves,
        ..SessionConfig::default()
    };
    match Simulation::with_config(config, catalog) {
        Ok(sim) => sim,
        Err(error) => panic!("fixture session is invalid: {error}"),
    }
}

/// Test-catalog session already in the playing state, with no waves.
#[must_use]
pub fn playing_session() -> Simulation {
    let mut sim = session(test_catalog(), WavePlan::default());
    if let Err(error) = sim.request_state_transition(Signal::Start) {
        panic!("could not start fixture session: {error}");
    }
    sim
}

/// Busy session on the built-in catalog: a few defenders and three
/// budgeted waves drawn from `seed`. Already playing.
#[must_use]
pub fn skirmish(seed: u64) -> Simulation {
    let mut plan = WavePlan::new(vec![
        WaveSpec::default()
            .with_budget(6)
            .with_spawn_interval(fixed(1)),
        WaveSpec::default()
            .with_budget(10)
            .with_spawn_interval(fixed(1)),
        WaveSpec::default()
            .with_budget(14)
            .with_spawn_interval(fixed_f(0.5)),
    ]);
    plan.seed = seed;
    plan.wave_delay = fixed(3);

    let mut config = SessionConfig {
        waves: plan,
        ..SessionConfig::default()
    };
    config.economy.starting_energy = 1000;
    let mut sim = match Simulation::with_config(config, UnitCatalog::builtin()) {
        Ok(sim) => sim,
        Err(error) => panic!("skirmish fixture is invalid: {error}"),
    };

    for row in 0..5 {
        let _ = sim.request_placement("guard", row, 1);
        let _ = sim.request_placement("shooter", row, 0);
    }
    let _ = sim.request_placement("energy_generator", 2, 2);
    if let Err(error) = sim.request_state_transition(Signal::Start) {
        panic!("could not start skirmish: {error}");
    }
    sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::state::GameState;

    #[test]
    fn test_catalog_shape() {
        let catalog = test_catalog();
        assert_eq!(catalog.of_faction(Faction::Defender).count(), 3);
        assert_eq!(catalog.of_faction(Faction::Attacker).count(), 2);
        assert!(catalog.iter().all(|unit| unit.stats.energy_cost == 0));
    }

    #[test]
    fn test_skirmish_starts_populated() {
        let sim = skirmish(1);
        assert_eq!(sim.state(), GameState::Playing);
        assert_eq!(sim.units().len(), 11);
    }
}
