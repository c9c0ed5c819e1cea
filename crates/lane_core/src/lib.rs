//! # Lane Core
//!
//! Deterministic simulation core for a lane-based tower-defense game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (waves use a seeded generator)
//! - No floating-point math (uses fixed-point)
//!
//! Defenders are placed on a row/column grid and attackers walk down the
//! rows toward the base. Units pick the nearest opposing unit in their
//! lane, trade melee blows or projectiles, and feed an energy/gold
//! economy that pays for placements.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Cell occupancy and world/grid conversion
//! - [`economy`] - Energy and gold ledger
//! - [`registry`] - Live unit records
//! - [`targeting`] - Nearest-target queries
//! - [`combat`] - Attack cadence, damage, deaths, movement
//! - [`projectile`] - Ballistic and homing projectiles
//! - [`state`] - Game state machine
//! - [`waves`] - Attacker wave scheduling
//! - [`simulation`] - Session driver and tick loop
//! - [`data`] - Unit catalog
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battlefield;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod grid;
pub mod math;
pub mod projectile;
pub mod registry;
pub mod simulation;
pub mod state;
pub mod targeting;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{LaneConfig, SessionConfig};
    pub use crate::data::{UnitCatalog, UnitData};
    pub use crate::economy::{EconomyConfig, ResourceKind, ResourceLedger};
    pub use crate::error::{GameError, PlacementError, Result, TransitionError};
    pub use crate::events::{DamageEvent, SimEvent, SimObserver, TickEvents};
    pub use crate::grid::{CellState, GridCoord, GridField, GridLayout};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::simulation::Simulation;
    pub use crate::state::{GameState, Signal};
    pub use crate::waves::{LaneChoice, WaveEntry, WavePlan, WaveSpec};
}
