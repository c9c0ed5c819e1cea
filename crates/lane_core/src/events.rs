//! Notifications emitted to the presentation layer.
//!
//! Events are queued while a tick or request runs and handed to every
//! registered [`SimObserver`] before the call returns, in emission order.
//! An event is only emitted when something actually changed.

use serde::{Deserialize, Serialize};

use crate::components::{Faction, UnitId};
use crate::state::GameState;

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    /// A unit entered the battlefield.
    UnitSpawned {
        /// New unit.
        unit: UnitId,
        /// Its faction.
        faction: Faction,
        /// Its lane.
        lane: u32,
    },
    /// A unit's health changed through damage or healing.
    HealthChanged {
        /// Affected unit.
        unit: UnitId,
        /// Health after the change.
        current: u32,
        /// Maximum health.
        max: u32,
    },
    /// A unit's health reached zero.
    UnitDied {
        /// Dead unit.
        unit: UnitId,
        /// Its faction.
        faction: Faction,
    },
    /// An attacker walked off the defended end of its lane.
    BaseBreached {
        /// Attacker that breached.
        unit: UnitId,
        /// Lane it came through.
        lane: u32,
    },
    /// Energy balance changed.
    EnergyChanged {
        /// New balance.
        energy: u32,
    },
    /// Gold balance changed.
    GoldChanged {
        /// New balance.
        gold: u32,
    },
    /// The game state machine changed state.
    GameStateChanged {
        /// State entered.
        state: GameState,
    },
    /// A new wave started.
    WaveProgress {
        /// One-based index of the wave now running.
        current: u32,
        /// Number of waves in the plan.
        total: u32,
    },
}

/// A single application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Unit that dealt the damage, if known.
    pub source: Option<UnitId>,
    /// Unit that took the damage.
    pub target: UnitId,
    /// Health actually removed.
    pub amount: u32,
    /// Whether this damage killed the target.
    pub killed: bool,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number after the step.
    pub tick: u64,
    /// Notifications, in emission order.
    pub events: Vec<SimEvent>,
    /// Damage applications, in resolution order.
    pub damage_events: Vec<DamageEvent>,
}

impl TickEvents {
    /// Units that died this tick.
    pub fn deaths(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimEvent::UnitDied { unit, .. } => Some(*unit),
            _ => None,
        })
    }

    /// Game state entered this tick, if any.
    #[must_use]
    pub fn state_change(&self) -> Option<GameState> {
        self.events.iter().rev().find_map(|event| match event {
            SimEvent::GameStateChanged { state } => Some(*state),
            _ => None,
        })
    }
}

/// Receiver of simulation notifications.
///
/// Any `FnMut(&SimEvent)` closure is an observer.
pub trait SimObserver {
    /// Called once per event, synchronously.
    fn on_event(&mut self, event: &SimEvent);
}

impl<F> SimObserver for F
where
    F: FnMut(&SimEvent),
{
    fn on_event(&mut self, event: &SimEvent) {
        self(event);
    }
}
