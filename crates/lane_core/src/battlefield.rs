//! The mutable simulation context shared by every system.
//!
//! A [`Battlefield`] bundles the grid, unit roster, ledger and in-flight
//! projectiles together with the outgoing event queue. Systems receive it
//! explicitly each tick. Resource mutations go through the helpers here so
//! every real balance change is paired with a notification.

use tracing::debug;

use crate::components::{Faction, UnitId};
use crate::economy::{EconomyConfig, ResourceLedger};
use crate::error::Result;
use crate::events::{DamageEvent, SimEvent};
use crate::grid::{CellState, GridField, GridLayout};
use crate::math::Fixed;
use crate::projectile::ProjectileSystem;
use crate::registry::UnitRegistry;

/// Grid, roster, economy and projectiles for one session.
#[derive(Debug, Clone)]
pub struct Battlefield {
    /// Placement grid.
    pub grid: GridField,
    /// Live units.
    pub units: UnitRegistry,
    /// Energy and gold.
    pub ledger: ResourceLedger,
    /// Projectiles in flight.
    pub projectiles: ProjectileSystem,
    events: Vec<SimEvent>,
    damage_log: Vec<DamageEvent>,
}

impl Battlefield {
    /// Create an empty battlefield.
    #[must_use]
    pub fn new(layout: GridLayout, economy: EconomyConfig) -> Self {
        Self {
            grid: GridField::new(layout),
            units: UnitRegistry::new(),
            ledger: ResourceLedger::new(economy),
            projectiles: ProjectileSystem::new(),
            events: Vec::new(),
            damage_log: Vec::new(),
        }
    }

    /// Queue a notification.
    pub fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Record an applied hit.
    pub fn log_damage(&mut self, event: DamageEvent) {
        self.damage_log.push(event);
    }

    /// Take all queued notifications.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take all recorded hits.
    pub fn drain_damage(&mut self) -> Vec<DamageEvent> {
        std::mem::take(&mut self.damage_log)
    }

    /// Credit energy and notify if the balance moved.
    pub fn credit_energy(&mut self, amount: u32) {
        if self.ledger.add_energy(amount) {
            self.emit(SimEvent::EnergyChanged {
                energy: self.ledger.energy(),
            });
        }
    }

    /// Credit gold and notify if the balance moved.
    pub fn credit_gold(&mut self, amount: u32) {
        if self.ledger.add_gold(amount) {
            self.emit(SimEvent::GoldChanged {
                gold: self.ledger.gold(),
            });
        }
    }

    /// Spend energy, all-or-nothing, notifying on success.
    pub fn spend_energy(&mut self, amount: u32) -> Result<()> {
        self.ledger.spend_energy(amount)?;
        if amount > 0 {
            self.emit(SimEvent::EnergyChanged {
                energy: self.ledger.energy(),
            });
        }
        Ok(())
    }

    /// Passive energy accrual plus income from living generators.
    ///
    /// Emits at most one energy notification for the whole step.
    pub fn accrue(&mut self, dt: Fixed) {
        let before = self.ledger.energy();
        self.ledger.accrue(dt);

        let mut produced = 0u32;
        for id in self.units.sorted_ids() {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            let Some(production) = unit.stats.energy_production else {
                continue;
            };
            if !unit.is_alive() || production.interval <= Fixed::ZERO {
                continue;
            }
            unit.production_timer += dt;
            while unit.production_timer >= production.interval {
                unit.production_timer -= production.interval;
                produced = produced.saturating_add(production.amount);
            }
        }
        self.ledger.add_energy(produced);

        if self.ledger.energy() != before {
            self.emit(SimEvent::EnergyChanged {
                energy: self.ledger.energy(),
            });
        }
    }

    /// Empty the grid, roster and projectiles and reset the ledger.
    pub fn reset(&mut self) {
        let (energy, gold) = (self.ledger.energy(), self.ledger.gold());
        self.grid.clear();
        self.units.clear();
        self.projectiles.clear();
        self.ledger.reset();
        self.damage_log.clear();
        debug!("Battlefield reset");

        if self.ledger.energy() != energy {
            self.emit(SimEvent::EnergyChanged {
                energy: self.ledger.energy(),
            });
        }
        if self.ledger.gold() != gold {
            self.emit(SimEvent::GoldChanged {
                gold: self.ledger.gold(),
            });
        }
    }

    /// Check grid and roster agree with each other.
    ///
    /// Every occupied cell must hold a living defender recorded at that
    /// cell, and every living defender must own exactly its recorded cell.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let cells_ok = self.grid.occupied().all(|(coord, id)| {
            self.units.get(id).is_some_and(|unit| {
                unit.faction == Faction::Defender && unit.is_alive() && unit.cell == Some(coord)
            })
        });
        let defenders_ok = self.units.alive_units_of(Faction::Defender).all(|unit| {
            unit.cell.is_some_and(|coord| {
                self.grid.cell(coord.row, coord.col) == Some(CellState::Occupied(unit.id))
            })
        });
        cells_ok && defenders_ok
    }

    /// Ids of living attackers.
    #[must_use]
    pub fn alive_attackers(&self) -> Vec<UnitId> {
        self.units
            .alive_units_of(Faction::Attacker)
            .map(|unit| unit.id)
            .collect()
    }
}
