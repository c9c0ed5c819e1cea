//! Session driver and tick loop.
//!
//! A [`Simulation`] owns one session: configuration, unit catalog, state
//! machine, battlefield and wave director. The host calls
//! [`Simulation::tick`] at the configured rate and forwards player input
//! through the request methods.
//!
//! # Determinism
//!
//! - Fixed-point math only
//! - Units and projectiles processed in id order
//! - Wave randomness from a generator seeded by the plan
//!
//! Two sessions fed the same requests in the same order produce the same
//! [`Simulation::state_hash`] at every tick.
//!
//! # Example
//!
//! ```
//! use lane_core::simulation::Simulation;
//! use lane_core::state::{GameState, Signal};
//!
//! let mut sim = Simulation::new();
//! let guard = sim.request_placement("guard", 2, 4).unwrap();
//! sim.request_state_transition(Signal::Start).unwrap();
//!
//! sim.tick();
//! assert_eq!(sim.get_tick(), 1);
//! assert_eq!(sim.state(), GameState::Playing);
//! assert!(sim.unit(guard).is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, warn};

use crate::battlefield::Battlefield;
use crate::combat::{self, CombatOutcome};
use crate::components::{Faction, UnitId, UnitRecord};
use crate::config::SessionConfig;
use crate::data::UnitCatalog;
use crate::economy::ResourceLedger;
use crate::error::{GameError, PlacementError, Result, TransitionError};
use crate::events::{SimEvent, SimObserver, TickEvents};
use crate::grid::{GridCoord, GridField};
use crate::math::{Fixed, Vec2Fixed};
use crate::projectile::{self, ProjectileSystem};
use crate::registry::UnitRegistry;
use crate::state::{GameState, GameStateMachine, Signal};
use crate::waves::WaveDirector;

/// One lane-defense session.
pub struct Simulation {
    config: SessionConfig,
    catalog: UnitCatalog,
    machine: GameStateMachine,
    field: Battlefield,
    waves: WaveDirector,
    tick: u64,
    tick_duration: Fixed,
    observers: Vec<Box<dyn SimObserver>>,
}

impl Simulation {
    /// Default session with the built-in catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SessionConfig::default(), UnitCatalog::builtin())
    }

    /// Session with a custom configuration and catalog.
    ///
    /// # Errors
    ///
    /// Returns the first validation error in `config` or its wave plan.
    pub fn with_config(config: SessionConfig, catalog: UnitCatalog) -> Result<Self> {
        config.validate()?;
        config.waves.validate(&catalog, config.grid.rows)?;
        Ok(Self::build(config, catalog))
    }

    fn build(config: SessionConfig, catalog: UnitCatalog) -> Self {
        Self {
            field: Battlefield::new(config.grid, config.economy),
            waves: WaveDirector::new(config.waves.clone()),
            tick_duration: config.tick_duration(),
            machine: GameStateMachine::new(),
            tick: 0,
            observers: Vec::new(),
            catalog,
            config,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of ticks simulated while playing since the session (re)started.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Seconds per tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Fixed {
        self.tick_duration
    }

    /// Current game state.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.machine.state()
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Unit types available to this session.
    #[must_use]
    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Grid, roster, ledger and projectiles.
    #[must_use]
    pub fn battlefield(&self) -> &Battlefield {
        &self.field
    }

    /// Placement grid.
    #[must_use]
    pub fn grid(&self) -> &GridField {
        &self.field.grid
    }

    /// Live units.
    #[must_use]
    pub fn units(&self) -> &UnitRegistry {
        &self.field.units
    }

    /// Energy and gold.
    #[must_use]
    pub fn ledger(&self) -> &ResourceLedger {
        &self.field.ledger
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &ProjectileSystem {
        &self.field.projectiles
    }

    /// Wave progress.
    #[must_use]
    pub fn waves(&self) -> &WaveDirector {
        &self.waves
    }

    /// Look up a live unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitRecord> {
        self.field.units.get(id)
    }

    /// Grid cell under a world position.
    #[must_use]
    pub fn world_to_grid(&self, position: Vec2Fixed) -> Option<GridCoord> {
        self.field.grid.world_to_grid(position)
    }

    /// Register an observer. Observers receive every event in emission
    /// order before the call that caused it returns.
    pub fn subscribe(&mut self, observer: impl SimObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ========================================================================
    // Tick loop
    // ========================================================================

    /// Advance the session by one tick.
    ///
    /// Does nothing unless the state is [`GameState::Playing`]; the tick
    /// counter does not move either.
    ///
    /// # System Order
    ///
    /// 1. Economy (passive accrual and generators)
    /// 2. Waves (attacker spawns)
    /// 3. Combat (attack cadence, melee, launches, movement, breaches)
    /// 4. Projectiles (flight and hits)
    /// 5. Outcome (defeat on breach, victory when every wave is cleared)
    pub fn tick(&mut self) -> TickEvents {
        if !self.machine.state().is_running() {
            return TickEvents {
                tick: self.tick,
                ..TickEvents::default()
            };
        }
        let dt = self.tick_duration;

        // 1. Economy
        self.field.accrue(dt);

        // 2. Waves
        self.run_wave_system(dt);

        // 3. Combat
        let combat = combat::run_combat(&mut self.field, dt, self.config.lanes.base_x);

        // 4. Projectiles
        let flights = projectile::run_projectiles(&mut self.field, dt);
        if flights.hits > 0 {
            debug!(tick = self.tick, hits = flights.hits, "Projectile hits");
        }

        // 5. Outcome
        self.run_outcome_check(&combat);

        self.tick += 1;

        #[cfg(feature = "debug-validation")]
        debug_assert!(
            self.field.is_consistent(),
            "grid and roster disagree at tick {}",
            self.tick
        );

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        TickEvents {
            tick: self.tick,
            events: self.flush_events(),
            damage_events: self.field.drain_damage(),
        }
    }

    fn run_wave_system(&mut self, dt: Fixed) {
        let step = self.waves.step(dt, &self.catalog, self.field.grid.rows());
        if let Some((current, total)) = step.started {
            self.field.emit(SimEvent::WaveProgress { current, total });
        }
        for (unit_type, lane) in step.spawns {
            if let Err(error) = self.insert_attacker(&unit_type, lane) {
                warn!(%error, unit_type, lane, "Wave spawn skipped");
            }
        }
    }

    fn run_outcome_check(&mut self, combat: &CombatOutcome) {
        let outcome = if !combat.breaches.is_empty() {
            self.machine.declare_defeat()
        } else if !self.config.waves.is_empty()
            && self.waves.is_finished()
            && self.field.units.count_alive(Faction::Attacker) == 0
        {
            self.machine.declare_victory()
        } else {
            return;
        };
        if let Ok(state) = outcome {
            self.field.emit(SimEvent::GameStateChanged { state });
        }
    }

    fn insert_attacker(&mut self, unit_type: &str, lane: u32) -> Result<UnitId> {
        let data = self
            .catalog
            .get(unit_type)
            .ok_or_else(|| GameError::UnknownUnitType(unit_type.to_string()))?;
        if data.faction != Faction::Attacker {
            return Err(GameError::InvalidConfig(format!(
                "'{unit_type}' is not an attacker"
            )));
        }
        let stats = data.stats;
        let id = self.field.units.spawn_attacker(
            &self.field.grid,
            unit_type,
            stats,
            lane,
            self.config.lanes.spawn_x,
        )?;
        debug!(unit = id, unit_type, lane, "Attacker spawned");
        self.field.emit(SimEvent::UnitSpawned {
            unit: id,
            faction: Faction::Attacker,
            lane,
        });
        Ok(id)
    }

    fn flush_events(&mut self) -> Vec<SimEvent> {
        let events = self.field.drain_events();
        for event in &events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
        events
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Buy a defender of `unit_type` and place it on `(row, col)`.
    ///
    /// Checks run in this order and the first failure is returned with
    /// nothing changed: session state, unit type, bounds, occupancy,
    /// energy.
    pub fn request_placement(
        &mut self,
        unit_type: &str,
        row: u32,
        col: u32,
    ) -> std::result::Result<UnitId, PlacementError> {
        let state = self.machine.state();
        if !state.accepts_placement() {
            return Err(PlacementError::NotAccepting(state));
        }
        let data = self
            .catalog
            .get(unit_type)
            .ok_or_else(|| PlacementError::UnknownUnitType(unit_type.to_string()))?;
        if !data.is_placeable() {
            return Err(PlacementError::NotPlaceable(unit_type.to_string()));
        }
        let stats = data.stats;

        if !self.field.grid.contains(row, col) {
            return Err(PlacementError::OutOfBounds { row, col });
        }
        if !self.field.grid.is_empty(row, col) {
            return Err(PlacementError::CellOccupied { row, col });
        }

        let cost = stats.energy_cost;
        let available = self.field.ledger.energy();
        if !self.field.ledger.can_afford_energy(cost) {
            return Err(PlacementError::InsufficientEnergy {
                required: cost,
                available,
            });
        }
        let id = self.field.units.spawn_defender(
            &mut self.field.grid,
            unit_type,
            stats,
            row,
            col,
        )?;
        if self.field.spend_energy(cost).is_err() {
            // Unreachable after the affordability check; undo the claim.
            self.field.grid.free(row, col);
            self.field.units.remove(id);
            return Err(PlacementError::InsufficientEnergy {
                required: cost,
                available,
            });
        }

        debug!(unit = id, unit_type, row, col, cost, "Defender placed");
        self.field.emit(SimEvent::UnitSpawned {
            unit: id,
            faction: Faction::Defender,
            lane: row,
        });
        self.flush_events();
        Ok(id)
    }

    /// Apply an external signal.
    ///
    /// [`Signal::Restart`] also empties the battlefield, resets the ledger
    /// and wave director and zeroes the tick counter.
    pub fn request_state_transition(
        &mut self,
        signal: Signal,
    ) -> std::result::Result<GameState, TransitionError> {
        let state = self.machine.apply(signal)?;
        self.field.emit(SimEvent::GameStateChanged { state });
        if signal == Signal::Restart {
            self.field.reset();
            self.waves.reset();
            self.tick = 0;
        }
        self.flush_events();
        Ok(state)
    }

    /// End the session as won. For hosts running without a wave plan.
    pub fn declare_victory(&mut self) -> std::result::Result<GameState, TransitionError> {
        let state = self.machine.declare_victory()?;
        self.field.emit(SimEvent::GameStateChanged { state });
        self.flush_events();
        Ok(state)
    }

    /// Spawn an attacker outside the wave plan.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] once the session has ended,
    /// [`GameError::UnknownUnitType`] or [`GameError::InvalidLane`] for
    /// bad arguments.
    pub fn spawn_attacker(&mut self, unit_type: &str, lane: u32) -> Result<UnitId> {
        let state = self.machine.state();
        if state.is_terminal() {
            return Err(GameError::InvalidState(format!(
                "cannot spawn attackers after the session ended ({state:?})"
            )));
        }
        let id = self.insert_attacker(unit_type, lane)?;
        self.flush_events();
        Ok(id)
    }

    /// Heal a live unit. Returns the health restored.
    ///
    /// # Errors
    ///
    /// [`GameError::UnitNotFound`] if `id` is not on the battlefield.
    pub fn heal_unit(&mut self, id: UnitId, amount: u32) -> Result<u32> {
        if !self.field.units.contains(id) {
            return Err(GameError::UnitNotFound(id));
        }
        let healed = combat::apply_heal(&mut self.field, id, amount);
        self.flush_events();
        Ok(healed)
    }

    // ========================================================================
    // Determinism
    // ========================================================================

    /// Hash of the complete simulation state.
    ///
    /// Used for determinism checks. Two simulations with identical state
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.machine.state().hash(&mut hasher);

        let ledger = &self.field.ledger;
        ledger.energy().hash(&mut hasher);
        ledger.gold().hash(&mut hasher);
        ledger.accrual_timer().to_bits().hash(&mut hasher);

        let ids = self.field.units.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(unit) = self.field.units.get(id) {
                id.hash(&mut hasher);
                unit.unit_type.hash(&mut hasher);
                unit.faction.hash(&mut hasher);
                unit.lane.hash(&mut hasher);
                unit.position.x.to_bits().hash(&mut hasher);
                unit.position.y.to_bits().hash(&mut hasher);
                unit.health.hash(&mut hasher);
                unit.attack_timer.to_bits().hash(&mut hasher);
                unit.current_target.hash(&mut hasher);
                unit.cell.hash(&mut hasher);
                unit.movement.hash(&mut hasher);
                unit.production_timer.to_bits().hash(&mut hasher);
            }
        }

        self.field.projectiles.len().hash(&mut hasher);
        for projectile in self.field.projectiles.iter() {
            projectile.hash(&mut hasher);
        }

        for (coord, occupant) in self.field.grid.occupied() {
            coord.hash(&mut hasher);
            occupant.hash(&mut hasher);
        }

        self.waves.hash_state(&mut hasher);

        hasher.finish()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("state", &self.machine.state())
            .field("units", &self.field.units.len())
            .field("projectiles", &self.field.projectiles.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
