//! Ownership of all live unit records.
//!
//! Units are stored by id and iterated in sorted id order so every pass
//! over the roster is deterministic. Removal of dead or breached units is
//! deferred: systems call [`UnitRegistry::schedule_removal`] while they
//! iterate and the owner flushes once the pass is over.
//!
//! The registry does not free grid cells or grant rewards when a unit
//! goes away; death side effects live in [`crate::combat`].

use std::collections::HashMap;

use crate::components::{Faction, Health, MovementState, UnitId, UnitRecord, UnitStats};
use crate::error::{GameError, PlacementError, Result};
use crate::grid::{GridCoord, GridField};
use crate::math::{Fixed, Vec2Fixed};

/// Id-indexed storage for unit records.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: HashMap<UnitId, UnitRecord>,
    next_id: UnitId,
    pending_removal: Vec<UnitId>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    /// Create an empty registry. The first id handed out is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
            pending_removal: Vec::new(),
        }
    }

    /// Number of stored units, dead-but-unflushed included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether `id` is stored.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Look up a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitRecord> {
        self.units.get(&id)
    }

    /// Look up a unit mutably.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut UnitRecord> {
        self.units.get_mut(&id)
    }

    /// Id the next spawned unit will receive.
    #[must_use]
    pub const fn next_id(&self) -> UnitId {
        self.next_id
    }

    fn record(
        id: UnitId,
        unit_type: &str,
        faction: Faction,
        lane: u32,
        position: Vec2Fixed,
        stats: UnitStats,
        cell: Option<GridCoord>,
    ) -> UnitRecord {
        UnitRecord {
            id,
            unit_type: unit_type.to_string(),
            faction,
            lane,
            position,
            stats,
            health: Health::new(stats.max_health),
            attack_timer: Fixed::ZERO,
            current_target: None,
            cell,
            movement: MovementState::Advancing,
            production_timer: Fixed::ZERO,
        }
    }

    /// Place a defender on `(row, col)` and claim the cell.
    ///
    /// Nothing is mutated when the cell is out of bounds or occupied.
    pub fn spawn_defender(
        &mut self,
        grid: &mut GridField,
        unit_type: &str,
        stats: UnitStats,
        row: u32,
        col: u32,
    ) -> std::result::Result<UnitId, PlacementError> {
        let coord = GridCoord::new(row, col);
        let position = grid
            .cell_center(coord)
            .ok_or(PlacementError::OutOfBounds { row, col })?;
        let id = self.next_id;
        if !grid.try_occupy(row, col, id) {
            return Err(PlacementError::CellOccupied { row, col });
        }
        self.next_id += 1;
        let record = Self::record(
            id,
            unit_type,
            Faction::Defender,
            row,
            position,
            stats,
            Some(coord),
        );
        self.units.insert(id, record);
        Ok(id)
    }

    /// Spawn an attacker at the entrance of `lane`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidLane`] if the lane is not on the grid.
    pub fn spawn_attacker(
        &mut self,
        grid: &GridField,
        unit_type: &str,
        stats: UnitStats,
        lane: u32,
        spawn_x: Fixed,
    ) -> Result<UnitId> {
        let y = grid.lane_y(lane).ok_or(GameError::InvalidLane {
            lane,
            lanes: grid.rows(),
        })?;
        let id = self.next_id;
        self.next_id += 1;
        let record = Self::record(
            id,
            unit_type,
            Faction::Attacker,
            lane,
            Vec2Fixed::new(spawn_x, y),
            stats,
            None,
        );
        self.units.insert(id, record);
        Ok(id)
    }

    /// Remove a unit immediately.
    pub fn remove(&mut self, id: UnitId) -> Option<UnitRecord> {
        self.units.remove(&id)
    }

    /// Queue a unit for removal at the end of the current pass.
    pub fn schedule_removal(&mut self, id: UnitId) {
        if !self.pending_removal.contains(&id) {
            self.pending_removal.push(id);
        }
    }

    /// Units queued for removal.
    #[must_use]
    pub fn pending_removals(&self) -> &[UnitId] {
        &self.pending_removal
    }

    /// Remove every queued unit. Returns how many were removed.
    pub fn flush_removals(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_removal);
        pending
            .into_iter()
            .filter(|id| self.units.remove(id).is_some())
            .count()
    }

    /// Get sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All units in id order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitRecord> + '_ {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.units.get(&id))
    }

    /// Living units of one faction, in id order.
    ///
    /// The iterator borrows the registry, so the roster it walks cannot
    /// change underneath it.
    pub fn alive_units_of(&self, faction: Faction) -> impl Iterator<Item = &UnitRecord> + '_ {
        self.iter()
            .filter(move |unit| unit.faction == faction && unit.is_alive())
    }

    /// Number of living units of one faction.
    #[must_use]
    pub fn count_alive(&self, faction: Faction) -> usize {
        self.alive_units_of(faction).count()
    }

    /// Drop every unit. Ids keep counting up so old references stay stale.
    pub fn clear(&mut self) {
        self.units.clear();
        self.pending_removal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridLayout;

    fn setup() -> (UnitRegistry, GridField) {
        (UnitRegistry::new(), GridField::new(GridLayout::default()))
    }

    #[test]
    fn test_spawn_defender_claims_cell() {
        let (mut units, mut grid) = setup();
        let id = units
            .spawn_defender(&mut grid, "guard", UnitStats::default(), 2, 4)
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(grid.occupant(2, 4), Some(id));
        let unit = units.get(id).unwrap();
        assert_eq!(unit.cell, Some(GridCoord::new(2, 4)));
        assert_eq!(unit.lane, 2);
        assert_eq!(unit.health.current, 100);
    }

    #[test]
    fn test_spawn_defender_rejections_leave_state_untouched() {
        let (mut units, mut grid) = setup();
        units
            .spawn_defender(&mut grid, "guard", UnitStats::default(), 0, 0)
            .unwrap();

        let occupied = units.spawn_defender(&mut grid, "guard", UnitStats::default(), 0, 0);
        assert_eq!(occupied, Err(PlacementError::CellOccupied { row: 0, col: 0 }));

        let outside = units.spawn_defender(&mut grid, "guard", UnitStats::default(), 7, 0);
        assert_eq!(outside, Err(PlacementError::OutOfBounds { row: 7, col: 0 }));

        assert_eq!(units.len(), 1);
        assert_eq!(units.next_id(), 2);
    }

    #[test]
    fn test_spawn_attacker_invalid_lane() {
        let (mut units, grid) = setup();
        let result = units.spawn_attacker(&grid, "grunt", UnitStats::default(), 9, Fixed::ZERO);
        assert!(matches!(result, Err(GameError::InvalidLane { lane: 9, lanes: 5 })));
        assert!(units.is_empty());
    }

    #[test]
    fn test_deferred_removal() {
        let (mut units, grid) = setup();
        let a = units
            .spawn_attacker(&grid, "grunt", UnitStats::default(), 0, Fixed::ZERO)
            .unwrap();
        let b = units
            .spawn_attacker(&grid, "grunt", UnitStats::default(), 1, Fixed::ZERO)
            .unwrap();

        units.schedule_removal(a);
        units.schedule_removal(a);
        assert!(units.contains(a));
        assert_eq!(units.flush_removals(), 1);
        assert!(!units.contains(a));
        assert!(units.contains(b));
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let (mut units, grid) = setup();
        units
            .spawn_attacker(&grid, "grunt", UnitStats::default(), 0, Fixed::ZERO)
            .unwrap();
        units.clear();
        let id = units
            .spawn_attacker(&grid, "grunt", UnitStats::default(), 0, Fixed::ZERO)
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn test_alive_units_of_filters_dead_and_faction() {
        let (mut units, mut grid) = setup();
        let defender = units
            .spawn_defender(&mut grid, "guard", UnitStats::default(), 1, 1)
            .unwrap();
        let alive = units
            .spawn_attacker(&grid, "grunt", UnitStats::default(), 1, Fixed::ZERO)
            .unwrap();
        let dead = units
            .spawn_attacker(&grid, "grunt", UnitStats::default(), 1, Fixed::ZERO)
            .unwrap();
        units.get_mut(dead).unwrap().health.current = 0;

        let attackers: Vec<UnitId> = units
            .alive_units_of(Faction::Attacker)
            .map(|u| u.id)
            .collect();
        assert_eq!(attackers, vec![alive]);
        assert_eq!(units.count_alive(Faction::Defender), 1);
        assert!(units.get(defender).is_some());
    }
}
