//! Unit type definitions for data-driven rosters.

use serde::{Deserialize, Serialize};

use crate::components::{AttackKind, Faction, UnitStats};
use crate::error::{GameError, Result};
use crate::math::Fixed;

/// Data-driven unit type definition.
///
/// Defenders are bought with energy and placed on the grid; attackers are
/// emitted by waves. The spawn fields only matter for attackers drawn
/// from a wave budget.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "grunt",
///     name: "Grunt",
///     faction: Attacker,
///     stats: (
///         max_health: 100,
///         attack_damage: 10,
///         move_speed: 1.0,
///         gold_reward: 10,
///     ),
///     tier: 1,
///     spawn_weight: 10,
///     point_cost: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier for this unit type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Side this type fights for.
    pub faction: Faction,

    /// Stat snapshot copied into every spawned unit.
    #[serde(default)]
    pub stats: UnitStats,

    /// Earliest wave (1-based) a budget may draw this type.
    #[serde(default = "default_tier")]
    pub tier: u32,

    /// Relative chance of being drawn from a wave budget.
    #[serde(default = "default_spawn_weight")]
    pub spawn_weight: u32,

    /// Budget points consumed when drawn.
    #[serde(default = "default_point_cost")]
    pub point_cost: u32,
}

/// Largest range, speed or projectile dimension a unit may declare, in
/// world units. Keeps squared distances inside the fixed-point range.
pub const MAX_UNIT_EXTENT: i32 = 1_000;

const fn default_tier() -> u32 {
    1
}

const fn default_spawn_weight() -> u32 {
    10
}

const fn default_point_cost() -> u32 {
    1
}

impl UnitData {
    /// Create a unit type with default spawn settings.
    #[must_use]
    pub fn new(id: impl Into<String>, faction: Faction, stats: UnitStats) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            faction,
            stats,
            tier: default_tier(),
            spawn_weight: default_spawn_weight(),
            point_cost: default_point_cost(),
        }
    }

    /// Whether this type can be placed on the grid.
    #[must_use]
    pub fn is_placeable(&self) -> bool {
        self.faction == Faction::Defender
    }

    /// Whether a wave budget can draw this type in wave `wave` (1-based).
    #[must_use]
    pub fn is_drawable(&self, wave: u32) -> bool {
        self.faction == Faction::Attacker
            && self.tier <= wave
            && self.spawn_weight > 0
            && self.point_cost > 0
    }

    /// Reject stat combinations the simulation cannot run.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| -> Result<()> {
            Err(GameError::InvalidConfig(format!(
                "unit '{}': {message}",
                self.id
            )))
        };
        let stats = &self.stats;
        if self.id.is_empty() {
            return fail("id must not be empty");
        }
        if stats.max_health == 0 {
            return fail("max_health must be positive");
        }
        if stats.attack_range < Fixed::ZERO || stats.move_speed < Fixed::ZERO {
            return fail("range and speed must not be negative");
        }
        let limit = Fixed::from_num(MAX_UNIT_EXTENT);
        if stats.attack_range > limit
            || stats.move_speed > limit
            || stats.projectile.speed > limit
            || stats.projectile.hit_radius > limit
            || stats.projectile.max_lifetime > limit
        {
            return fail(&format!(
                "range, speed and projectile values must not exceed {MAX_UNIT_EXTENT}"
            ));
        }
        if stats.attack_kind == AttackKind::Ranged
            && (stats.projectile.speed <= Fixed::ZERO
                || stats.projectile.max_lifetime <= Fixed::ZERO)
        {
            return fail("ranged units need a positive projectile speed and lifetime");
        }
        if let Some(production) = stats.energy_production {
            if production.interval <= Fixed::ZERO {
                return fail("energy production interval must be positive");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let ron = r#"UnitData(
            id: "grunt",
            name: "Grunt",
            faction: Attacker,
            stats: (move_speed: 1.0, gold_reward: 10),
        )"#;
        let unit: UnitData = ron::from_str(ron).unwrap();
        assert_eq!(unit.tier, 1);
        assert_eq!(unit.spawn_weight, 10);
        assert_eq!(unit.point_cost, 1);
        assert_eq!(unit.stats.move_speed, Fixed::ONE);
        assert!(unit.is_drawable(1));
        assert!(!unit.is_placeable());
    }

    #[test]
    fn test_tier_gates_drawing() {
        let mut unit = UnitData::new("brute", Faction::Attacker, UnitStats::default());
        unit.tier = 3;
        assert!(!unit.is_drawable(2));
        assert!(unit.is_drawable(3));
    }

    #[test]
    fn test_validation() {
        let ok = UnitData::new("guard", Faction::Defender, UnitStats::default());
        assert!(ok.validate().is_ok());

        let dead = UnitData::new("ghost", Faction::Defender, UnitStats::passive(0));
        assert!(dead.validate().is_err());

        let mut stats = UnitStats::default();
        stats.attack_kind = AttackKind::Ranged;
        stats.projectile.speed = Fixed::ZERO;
        let stuck = UnitData::new("stuck", Faction::Defender, stats);
        assert!(stuck.validate().is_err());
    }

    #[test]
    fn test_validation_caps_extents() {
        let far = UnitStats::default().with_range(Fixed::from_num(50_000));
        let sniper = UnitData::new("sniper", Faction::Defender, far);
        assert!(matches!(sniper.validate(), Err(GameError::InvalidConfig(_))));

        let edge = UnitStats::default().with_range(Fixed::from_num(MAX_UNIT_EXTENT));
        assert!(UnitData::new("edge", Faction::Defender, edge).validate().is_ok());

        let mut fast = UnitStats::default();
        fast.move_speed = Fixed::from_num(MAX_UNIT_EXTENT + 1);
        assert!(UnitData::new("fast", Faction::Attacker, fast).validate().is_err());

        let mut bolt = UnitStats::default();
        bolt.attack_kind = AttackKind::Ranged;
        bolt.projectile.speed = Fixed::from_num(1_000_000);
        assert!(UnitData::new("bolt", Faction::Defender, bolt).validate().is_err());
    }
}
