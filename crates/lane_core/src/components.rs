//! Unit data: identities, factions, stat snapshots and the live record.
//!
//! A single [`UnitRecord`] type covers both factions. Behavior that
//! differs by side (movement, target eligibility, death side effects)
//! is selected from [`Faction`] by the systems that read the record.

use serde::{Deserialize, Serialize};

use crate::grid::GridCoord;
use crate::math::{decimal_serde, Fixed, Vec2Fixed};

/// Unique identifier for a unit. Ids are never reused within a session.
pub type UnitId = u64;

/// Unique identifier for an in-flight projectile.
pub type ProjectileId = u64;

/// Which side of the lane a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// Placed on the grid, stationary.
    Defender,
    /// Spawned at the lane entrance, advances toward the base.
    Attacker,
}

impl Faction {
    /// The faction this one fights against.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Defender => Self::Attacker,
            Self::Attacker => Self::Defender,
        }
    }
}

/// How a unit delivers its attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackKind {
    /// Never attacks (walls, generators).
    None,
    /// Damage applied to the target immediately.
    #[default]
    Melee,
    /// Damage carried by a projectile.
    Ranged,
}

/// Flight policy for projectiles fired by a ranged unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Guidance {
    /// Fixed direction chosen at launch; hits the first eligible unit on its path.
    #[default]
    Ballistic,
    /// Re-aims at its target each tick; despawns if the target dies.
    Homing,
}

/// Projectile parameters for a ranged unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSpec {
    /// Flight policy.
    pub guidance: Guidance,
    /// Travel speed in world units per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,
    /// Seconds before the projectile expires without hitting.
    #[serde(with = "decimal_serde")]
    pub max_lifetime: Fixed,
    /// Collision radius around the projectile.
    #[serde(with = "decimal_serde")]
    pub hit_radius: Fixed,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            guidance: Guidance::Ballistic,
            speed: Fixed::from_num(10),
            max_lifetime: Fixed::from_num(5),
            hit_radius: Fixed::from_num(0.3),
        }
    }
}

/// Periodic energy income granted by a living unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnergyProduction {
    /// Energy credited per interval.
    pub amount: u32,
    /// Seconds between credits.
    #[serde(with = "decimal_serde")]
    pub interval: Fixed,
}

/// Immutable stat snapshot copied into a unit when it spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    /// Maximum (and starting) health.
    pub max_health: u32,
    /// Damage per attack.
    pub attack_damage: u32,
    /// Attack cadence.
    #[serde(with = "decimal_serde")]
    pub attacks_per_second: Fixed,
    /// Maximum attack distance.
    #[serde(with = "decimal_serde")]
    pub attack_range: Fixed,
    /// Melee, ranged or none.
    pub attack_kind: AttackKind,
    /// Projectile policy, used when `attack_kind` is ranged.
    pub projectile: ProjectileSpec,
    /// Advance speed in world units per second (attackers only).
    #[serde(with = "decimal_serde")]
    pub move_speed: Fixed,
    /// Gold credited when this unit dies as an attacker.
    pub gold_reward: u32,
    /// Energy paid to place this unit as a defender.
    pub energy_cost: u32,
    /// Optional passive energy income.
    pub energy_production: Option<EnergyProduction>,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: 100,
            attack_damage: 10,
            attacks_per_second: Fixed::ONE,
            attack_range: Fixed::ONE,
            attack_kind: AttackKind::Melee,
            projectile: ProjectileSpec::default(),
            move_speed: Fixed::ZERO,
            gold_reward: 0,
            energy_cost: 0,
            energy_production: None,
        }
    }
}

impl UnitStats {
    /// Melee stats with the given health and damage.
    #[must_use]
    pub fn melee(max_health: u32, attack_damage: u32) -> Self {
        Self {
            max_health,
            attack_damage,
            ..Self::default()
        }
    }

    /// Stats for a unit that never attacks.
    #[must_use]
    pub fn passive(max_health: u32) -> Self {
        Self {
            max_health,
            attack_damage: 0,
            attack_kind: AttackKind::None,
            ..Self::default()
        }
    }

    /// Switch to a ranged attack with the given projectile policy.
    #[must_use]
    pub fn with_projectile(mut self, projectile: ProjectileSpec) -> Self {
        self.attack_kind = AttackKind::Ranged;
        self.projectile = projectile;
        self
    }

    /// Set the attack range.
    #[must_use]
    pub fn with_range(mut self, range: Fixed) -> Self {
        self.attack_range = range;
        self
    }

    /// Set the attack cadence.
    #[must_use]
    pub fn with_attack_rate(mut self, attacks_per_second: Fixed) -> Self {
        self.attacks_per_second = attacks_per_second;
        self
    }

    /// Set the advance speed.
    #[must_use]
    pub fn with_move_speed(mut self, speed: Fixed) -> Self {
        self.move_speed = speed;
        self
    }

    /// Set the gold reward.
    #[must_use]
    pub fn with_gold_reward(mut self, gold: u32) -> Self {
        self.gold_reward = gold;
        self
    }

    /// Set the placement cost.
    #[must_use]
    pub fn with_energy_cost(mut self, energy: u32) -> Self {
        self.energy_cost = energy;
        self
    }

    /// Add passive energy income.
    #[must_use]
    pub fn with_energy_production(mut self, amount: u32, interval: Fixed) -> Self {
        self.energy_production = Some(EnergyProduction { amount, interval });
        self
    }

    /// Seconds between attacks, or `None` if this unit never attacks.
    #[must_use]
    pub fn attack_interval(&self) -> Option<Fixed> {
        if self.attack_kind == AttackKind::None || self.attacks_per_second <= Fixed::ZERO {
            return None;
        }
        let interval = Fixed::ONE / self.attacks_per_second;
        (interval > Fixed::ZERO).then_some(interval)
    }
}

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if the unit is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Heal, returning actual amount healed. Never exceeds `max` and
    /// never revives.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead() {
            return 0;
        }
        let headroom = self.max.saturating_sub(self.current);
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }
}

/// Whether an attacker is walking or held by an in-range target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementState {
    /// Moving toward the base.
    #[default]
    Advancing,
    /// Stopped at an in-range target.
    Engaged,
}

/// A live unit owned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Stable identifier.
    pub id: UnitId,
    /// Catalog id of the unit type.
    pub unit_type: String,
    /// Side this unit fights for.
    pub faction: Faction,
    /// Lane (grid row) the unit occupies.
    pub lane: u32,
    /// World position.
    pub position: Vec2Fixed,
    /// Stats copied at spawn.
    pub stats: UnitStats,
    /// Current and maximum health.
    pub health: Health,
    /// Seconds accumulated toward the next attack.
    #[serde(with = "crate::math::fixed_serde")]
    pub attack_timer: Fixed,
    /// Last acquired target. May be stale; revalidate before use.
    pub current_target: Option<UnitId>,
    /// Grid cell held by a defender.
    pub cell: Option<GridCoord>,
    /// Attacker movement state.
    pub movement: MovementState,
    /// Seconds accumulated toward the next energy credit.
    #[serde(with = "crate::math::fixed_serde")]
    pub production_timer: Fixed,
}

impl UnitRecord {
    /// Check if the unit is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Squared distance to another unit.
    #[must_use]
    pub fn distance_squared_to(&self, other: &Self) -> Fixed {
        self.position.distance_squared(other.position)
    }

    /// Whether `other` lies within this unit's attack range.
    #[must_use]
    pub fn in_range_of(&self, other: &Self) -> bool {
        let range = self.stats.attack_range;
        self.distance_squared_to(other) <= range.saturating_mul(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_saturates() {
        let mut health = Health::new(30);
        assert_eq!(health.apply_damage(20), 20);
        assert_eq!(health.apply_damage(20), 10);
        assert_eq!(health.current, 0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_health_heal_clamps_to_max() {
        let mut health = Health::new(100);
        health.apply_damage(30);
        assert_eq!(health.heal(50), 30);
        assert_eq!(health.current, 100);
    }

    #[test]
    fn test_attack_interval() {
        let stats = UnitStats::melee(100, 10).with_attack_rate(Fixed::from_num(4));
        assert_eq!(stats.attack_interval(), Some(Fixed::from_num(0.25)));
        assert_eq!(UnitStats::passive(50).attack_interval(), None);
        let frozen = UnitStats::melee(100, 10).with_attack_rate(Fixed::ZERO);
        assert_eq!(frozen.attack_interval(), None);
    }

    #[test]
    fn test_faction_opposite() {
        assert_eq!(Faction::Defender.opposite(), Faction::Attacker);
        assert_eq!(Faction::Attacker.opposite(), Faction::Defender);
    }

    #[test]
    fn test_stats_parse_with_defaults() {
        let stats: UnitStats = ron::from_str("(max_health: 80, attack_kind: None)").unwrap();
        assert_eq!(stats.max_health, 80);
        assert_eq!(stats.attack_kind, AttackKind::None);
        assert_eq!(stats.attack_range, Fixed::ONE);
        assert_eq!(stats.projectile.speed, Fixed::from_num(10));
    }
}
