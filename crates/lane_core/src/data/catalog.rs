//! Lookup table of unit types.

use std::collections::BTreeMap;

use crate::components::{Faction, Guidance, ProjectileSpec, UnitStats};
use crate::error::{GameError, Result};
use crate::math::Fixed;

use super::UnitData;

/// Unit types keyed by id.
///
/// Iteration is in id order, which keeps weighted draws deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCatalog {
    units: BTreeMap<String, UnitData>,
}

impl UnitCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, validating every entry.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for duplicate ids or invalid stats.
    pub fn from_units(units: impl IntoIterator<Item = UnitData>) -> Result<Self> {
        let mut catalog = Self::new();
        for unit in units {
            catalog.insert(unit)?;
        }
        Ok(catalog)
    }

    /// Parse a RON list of [`UnitData`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not valid RON,
    /// or a validation error from [`UnitCatalog::from_units`].
    pub fn from_ron_str(source: &str, path: &str) -> Result<Self> {
        let units: Vec<UnitData> =
            ron::from_str(source).map_err(|e| GameError::DataParseError {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        Self::from_units(units)
    }

    /// Add a unit type.
    ///
    /// # Errors
    ///
    /// Rejects duplicate ids and invalid stats without modifying the catalog.
    pub fn insert(&mut self, unit: UnitData) -> Result<()> {
        unit.validate()?;
        if self.units.contains_key(&unit.id) {
            return Err(GameError::InvalidConfig(format!(
                "duplicate unit id '{}'",
                unit.id
            )));
        }
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Look up a unit type.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&UnitData> {
        self.units.get(id)
    }

    /// Whether `id` is known.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Number of unit types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All unit types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitData> + '_ {
        self.units.values()
    }

    /// Unit types of one faction in id order.
    pub fn of_faction(&self, faction: Faction) -> impl Iterator<Item = &UnitData> + '_ {
        self.iter().filter(move |unit| unit.faction == faction)
    }

    /// The stock roster: three defenders and two attackers.
    ///
    /// | id                 | side     | notes                               |
    /// |--------------------|----------|-------------------------------------|
    /// | `guard`            | defender | melee, 50 energy                    |
    /// | `shooter`          | defender | ballistic, range 8, 100 energy      |
    /// | `energy_generator` | defender | no attack, 25 energy every 5 s      |
    /// | `grunt`            | attacker | melee, speed 1, 10 gold             |
    /// | `archer`           | attacker | homing, range 3, tier 2, 20 gold    |
    #[must_use]
    pub fn builtin() -> Self {
        let guard = UnitData::new(
            "guard",
            Faction::Defender,
            UnitStats::melee(150, 15).with_energy_cost(50),
        );
        let shooter = UnitData::new(
            "shooter",
            Faction::Defender,
            UnitStats::melee(100, 20)
                .with_projectile(ProjectileSpec::default())
                .with_range(Fixed::from_num(8))
                .with_energy_cost(100),
        );
        let generator = UnitData::new(
            "energy_generator",
            Faction::Defender,
            UnitStats::passive(80)
                .with_energy_cost(50)
                .with_energy_production(25, Fixed::from_num(5)),
        );
        let grunt = UnitData::new(
            "grunt",
            Faction::Attacker,
            UnitStats::melee(100, 10)
                .with_move_speed(Fixed::ONE)
                .with_gold_reward(10),
        );
        let mut archer = UnitData::new(
            "archer",
            Faction::Attacker,
            UnitStats::melee(70, 8)
                .with_projectile(ProjectileSpec {
                    guidance: Guidance::Homing,
                    speed: Fixed::from_num(6),
                    ..ProjectileSpec::default()
                })
                .with_range(Fixed::from_num(3))
                .with_move_speed(Fixed::from_num(0.75))
                .with_gold_reward(20),
        );
        archer.tier = 2;
        archer.spawn_weight = 5;
        archer.point_cost = 2;

        let mut units = BTreeMap::new();
        for unit in [guard, shooter, generator, grunt, archer] {
            units.insert(unit.id.clone(), unit);
        }
        Self { units }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let catalog = UnitCatalog::builtin();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.iter().all(|unit| unit.validate().is_ok()));
        assert_eq!(catalog.of_faction(Faction::Defender).count(), 3);
        let ids: Vec<&str> = catalog
            .of_faction(Faction::Attacker)
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(ids, vec!["archer", "grunt"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let unit = UnitData::new("guard", Faction::Defender, UnitStats::default());
        let result = UnitCatalog::from_units([unit.clone(), unit]);
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_ron_str() {
        let ron = r#"[
            UnitData(id: "wall", name: "Wall", faction: Defender,
                     stats: (max_health: 400, attack_kind: None, energy_cost: 25)),
            UnitData(id: "runner", name: "Runner", faction: Attacker,
                     stats: (max_health: 40, move_speed: 2.0)),
        ]"#;
        let catalog = UnitCatalog::from_ron_str(ron, "inline").unwrap();
        assert_eq!(catalog.get("wall").unwrap().stats.energy_cost, 25);
        assert_eq!(
            catalog.get("runner").unwrap().stats.move_speed,
            Fixed::from_num(2)
        );
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = UnitCatalog::from_ron_str("[ nonsense", "units.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { ref path, .. } if path == "units.ron"));
    }
}
