//! Attack cadence, damage application and death side effects.
//!
//! Each tick, every living unit in id order:
//!
//! 1. advances its attack timer (units that never attack are skipped);
//! 2. when the timer reaches the attack interval, subtracts the interval
//!    and fires at most once: it revalidates its remembered target,
//!    re-acquiring through [`crate::targeting`] when stale, and attacks if
//!    the target is in range;
//! 3. if it is an attacker, walks toward the base unless an in-range
//!    target holds it, and breaches when it reaches the base line.
//!
//! Deaths free the defender's cell or credit the attacker's gold reward,
//! then queue the unit for removal. Removals are flushed once the pass
//! has finished.

use tracing::{debug, warn};

use crate::battlefield::Battlefield;
use crate::components::{AttackKind, Faction, MovementState, UnitId};
use crate::events::{DamageEvent, SimEvent};
use crate::math::Fixed;
use crate::targeting;

/// Result of one combat pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatOutcome {
    /// Attackers that reached the base this pass.
    pub breaches: Vec<UnitId>,
    /// Projectiles launched this pass.
    pub projectiles_fired: u32,
}

/// Run the combat pass for one tick.
pub fn run_combat(field: &mut Battlefield, dt: Fixed, base_x: Fixed) -> CombatOutcome {
    let mut outcome = CombatOutcome::default();

    for id in field.units.sorted_ids() {
        if attack_step(field, id, dt) {
            outcome.projectiles_fired += 1;
        }
        if movement_step(field, id, dt, base_x) {
            outcome.breaches.push(id);
        }
    }

    field.units.flush_removals();
    outcome
}

/// Keep `id`'s remembered target if still legal, else acquire a new one.
///
/// The result is stored back on the unit.
pub fn resolve_target(field: &mut Battlefield, id: UnitId) -> Option<UnitId> {
    let unit = field.units.get(id)?;
    if let Some(current) = unit.current_target {
        if targeting::is_valid_target(&field.units, unit, current) {
            return Some(current);
        }
    }
    let found = targeting::find_target(&field.units, unit);
    if let Some(unit) = field.units.get_mut(id) {
        unit.current_target = found;
    }
    found
}

/// In-range target for `id`, if it has one.
fn engaged_target(field: &mut Battlefield, id: UnitId) -> Option<UnitId> {
    let target = resolve_target(field, id)?;
    let unit = field.units.get(id)?;
    let other = field.units.get(target)?;
    unit.in_range_of(other).then_some(target)
}

/// Advance the attack timer and attack if due. Returns `true` when a
/// projectile was launched.
fn attack_step(field: &mut Battlefield, id: UnitId, dt: Fixed) -> bool {
    let Some(unit) = field.units.get_mut(id) else {
        return false;
    };
    if !unit.is_alive() {
        return false;
    }
    let Some(interval) = unit.stats.attack_interval() else {
        return false;
    };

    unit.attack_timer += dt;
    if unit.attack_timer < interval {
        return false;
    }
    unit.attack_timer -= interval;
    // At most one attack per tick; drop whole extra intervals.
    if unit.attack_timer >= interval {
        unit.attack_timer %= interval;
    }

    let Some(target) = engaged_target(field, id) else {
        return false;
    };
    let Some(unit) = field.units.get(id) else {
        return false;
    };
    let (kind, damage, spec) = (
        unit.stats.attack_kind,
        unit.stats.attack_damage,
        unit.stats.projectile,
    );

    match kind {
        AttackKind::None => false,
        AttackKind::Melee => {
            apply_damage(field, Some(id), target, damage);
            false
        }
        AttackKind::Ranged => {
            let (Some(shooter), Some(victim)) = (field.units.get(id), field.units.get(target))
            else {
                return false;
            };
            let launched = field.projectiles.launch(shooter, victim, damage, spec);
            debug!(shooter = id, target, projectile = launched, "Projectile launched");
            true
        }
    }
}

/// Walk an attacker toward the base. Returns `true` on a breach.
fn movement_step(field: &mut Battlefield, id: UnitId, dt: Fixed, base_x: Fixed) -> bool {
    let Some(unit) = field.units.get(id) else {
        return false;
    };
    if unit.faction != Faction::Attacker || !unit.is_alive() {
        return false;
    }
    let can_attack = unit.stats.attack_interval().is_some();
    let engaged = can_attack && engaged_target(field, id).is_some();

    let Some(unit) = field.units.get_mut(id) else {
        return false;
    };
    if engaged {
        unit.movement = MovementState::Engaged;
        return false;
    }
    unit.movement = MovementState::Advancing;
    unit.position.x -= unit.stats.move_speed * dt;

    if unit.position.x > base_x {
        return false;
    }
    let lane = unit.lane;
    warn!(unit = id, lane, "Attacker breached the base");
    field.units.schedule_removal(id);
    field.emit(SimEvent::BaseBreached { unit: id, lane });
    true
}

/// Apply `amount` damage to `target`.
///
/// Ignored when the target is missing or dead, or when `amount` is zero.
/// Health never drops below zero; reaching zero triggers death handling.
/// Returns the health actually removed.
pub fn apply_damage(
    field: &mut Battlefield,
    source: Option<UnitId>,
    target: UnitId,
    amount: u32,
) -> u32 {
    if amount == 0 {
        return 0;
    }
    let Some(unit) = field.units.get_mut(target) else {
        return 0;
    };
    if !unit.is_alive() {
        return 0;
    }

    let dealt = unit.health.apply_damage(amount);
    let (current, max) = (unit.health.current, unit.health.max);
    let killed = unit.health.is_dead();

    field.emit(SimEvent::HealthChanged {
        unit: target,
        current,
        max,
    });
    field.log_damage(DamageEvent {
        source,
        target,
        amount: dealt,
        killed,
    });

    if killed {
        handle_death(field, target);
    }
    dealt
}

/// Heal `target` by up to `amount`, never above its maximum.
///
/// Dead or missing units are ignored. Returns the health restored.
pub fn apply_heal(field: &mut Battlefield, target: UnitId, amount: u32) -> u32 {
    let Some(unit) = field.units.get_mut(target) else {
        return 0;
    };
    if !unit.is_alive() {
        return 0;
    }
    let healed = unit.health.heal(amount);
    if healed > 0 {
        let (current, max) = (unit.health.current, unit.health.max);
        field.emit(SimEvent::HealthChanged {
            unit: target,
            current,
            max,
        });
    }
    healed
}

/// Side effects of a unit reaching zero health.
///
/// Targets and homing projectiles referencing the unit are not touched
/// here; they notice the death the next time they revalidate.
fn handle_death(field: &mut Battlefield, id: UnitId) {
    let Some(unit) = field.units.get(id) else {
        return;
    };
    let (faction, cell, reward) = (unit.faction, unit.cell, unit.stats.gold_reward);

    debug!(unit = id, ?faction, "Unit died");
    field.units.schedule_removal(id);
    field.emit(SimEvent::UnitDied { unit: id, faction });

    match faction {
        Faction::Defender => {
            if let Some(coord) = cell {
                if field.grid.occupant(coord.row, coord.col) == Some(id) {
                    field.grid.free(coord.row, coord.col);
                }
            }
        }
        Faction::Attacker => field.credit_gold(reward),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ProjectileSpec, UnitStats};
    use crate::economy::EconomyConfig;
    use crate::grid::GridLayout;

    fn field() -> Battlefield {
        Battlefield::new(GridLayout::default(), EconomyConfig::default())
    }

    fn dt() -> Fixed {
        Fixed::ONE / Fixed::from_num(32)
    }

    fn base() -> Fixed {
        Fixed::from_num(-6)
    }

    #[test]
    fn test_damage_ignored_for_zero_and_dead() {
        let mut field = field();
        let id = field
            .units
            .spawn_attacker(&field.grid, "grunt", UnitStats::melee(30, 5), 0, Fixed::ZERO)
            .unwrap();

        assert_eq!(apply_damage(&mut field, None, id, 0), 0);
        assert!(field.drain_events().is_empty());

        assert_eq!(apply_damage(&mut field, None, id, 50), 30);
        assert_eq!(apply_damage(&mut field, None, id, 10), 0);
        assert_eq!(field.units.get(id).unwrap().health.current, 0);
        assert_eq!(field.drain_damage().len(), 1);
    }

    #[test]
    fn test_attacker_death_credits_gold() {
        let mut field = field();
        let stats = UnitStats::melee(10, 5).with_gold_reward(10);
        let id = field
            .units
            .spawn_attacker(&field.grid, "grunt", stats, 1, Fixed::ZERO)
            .unwrap();

        apply_damage(&mut field, None, id, 10);
        assert_eq!(field.ledger.gold(), 10);
        assert_eq!(
            field.drain_events(),
            vec![
                SimEvent::HealthChanged {
                    unit: id,
                    current: 0,
                    max: 10
                },
                SimEvent::UnitDied {
                    unit: id,
                    faction: Faction::Attacker
                },
                SimEvent::GoldChanged { gold: 10 },
            ]
        );
        assert_eq!(field.units.pending_removals(), &[id]);
    }

    #[test]
    fn test_defender_death_frees_cell() {
        let mut field = field();
        let id = field
            .units
            .spawn_defender(&mut field.grid, "guard", UnitStats::passive(20), 3, 3)
            .unwrap();
        apply_damage(&mut field, None, id, 25);
        assert!(field.grid.is_empty(3, 3));
        field.units.flush_removals();
        assert!(field.units.get(id).is_none());
    }

    #[test]
    fn test_heal_clamps_and_skips_dead() {
        let mut field = field();
        let id = field
            .units
            .spawn_attacker(&field.grid, "grunt", UnitStats::melee(50, 5), 0, Fixed::ZERO)
            .unwrap();
        apply_damage(&mut field, None, id, 20);
        assert_eq!(apply_heal(&mut field, id, 100), 20);
        assert_eq!(apply_heal(&mut field, id, 5), 0);
        apply_damage(&mut field, None, id, 50);
        assert_eq!(apply_heal(&mut field, id, 5), 0);
    }

    #[test]
    fn test_attacker_walks_and_breaches() {
        let mut field = field();
        let stats = UnitStats::melee(100, 10).with_move_speed(Fixed::from_num(32));
        let id = field
            .units
            .spawn_attacker(&field.grid, "grunt", stats, 0, Fixed::from_num(-4))
            .unwrap();

        // 1 unit per tick.
        let outcome = run_combat(&mut field, dt(), base());
        assert!(outcome.breaches.is_empty());
        assert_eq!(field.units.get(id).unwrap().position.x, Fixed::from_num(-5));

        let outcome = run_combat(&mut field, dt(), base());
        assert_eq!(outcome.breaches, vec![id]);
        assert!(field.units.get(id).is_none());
        assert!(field
            .drain_events()
            .contains(&SimEvent::BaseBreached { unit: id, lane: 0 }));
    }

    #[test]
    fn test_attacker_stops_at_in_range_defender() {
        let mut field = field();
        let defender = field
            .units
            .spawn_defender(&mut field.grid, "wall", UnitStats::passive(1000), 0, 4)
            .unwrap();
        let stats = UnitStats::melee(100, 10).with_move_speed(Fixed::ONE);
        let attacker = field
            .units
            .spawn_attacker(&field.grid, "grunt", stats, 0, Fixed::from_num(0.5))
            .unwrap();

        run_combat(&mut field, dt(), base());
        let unit = field.units.get(attacker).unwrap();
        assert_eq!(unit.movement, MovementState::Engaged);
        assert_eq!(unit.position.x, Fixed::from_num(0.5));
        assert_eq!(unit.current_target, Some(defender));
    }

    #[test]
    fn test_attack_cadence_subtracts_interval() {
        let mut field = field();
        let stats = UnitStats::melee(100, 10).with_attack_rate(Fixed::from_num(4));
        let id = field
            .units
            .spawn_attacker(&field.grid, "grunt", stats, 4, Fixed::from_num(5))
            .unwrap();
        // 0.25s interval at 1/32s ticks: fires every 8 ticks, timer back to 0.
        for _ in 0..8 {
            run_combat(&mut field, dt(), base());
        }
        assert_eq!(field.units.get(id).unwrap().attack_timer, Fixed::ZERO);

        // A long tick fires once and keeps the remainder below one interval.
        run_combat(&mut field, Fixed::from_num(0.6), base());
        let timer = field.units.get(id).unwrap().attack_timer;
        assert!(timer < Fixed::from_num(0.25));
    }

    #[test]
    fn test_ranged_unit_launches_projectile() {
        let mut field = field();
        let shooter_stats = UnitStats::melee(100, 15)
            .with_projectile(ProjectileSpec::default())
            .with_range(Fixed::from_num(8));
        let shooter = field
            .units
            .spawn_defender(&mut field.grid, "shooter", shooter_stats, 1, 0)
            .unwrap();
        field
            .units
            .spawn_attacker(&field.grid, "grunt", UnitStats::melee(100, 10), 1, Fixed::ZERO)
            .unwrap();

        let mut fired = 0;
        for _ in 0..32 {
            fired += run_combat(&mut field, dt(), base()).projectiles_fired;
        }
        assert_eq!(fired, 1);
        assert_eq!(field.projectiles.len(), 1);
        assert_eq!(field.projectiles.iter().next().map(|p| p.owner), Some(shooter));
    }
}
