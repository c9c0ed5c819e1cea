//! Session configuration.
//!
//! Every field has a default, so a RON file only needs to name what it
//! changes:
//!
//! ```ron
//! (
//!     grid: (rows: 3, cols: 7),
//!     economy: (starting_energy: 150),
//!     lanes: (spawn_x: 8.0),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::economy::EconomyConfig;
use crate::error::{GameError, Result};
use crate::grid::GridLayout;
use crate::math::{decimal_serde, Fixed};
use crate::waves::WavePlan;

/// Default simulation rate. A power of two keeps the tick duration exact.
pub const DEFAULT_TICK_RATE: u32 = 32;

/// Fastest accepted simulation rate.
pub const MAX_TICK_RATE: u32 = 1024;

/// Where attackers enter and where they breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Lane-axis coordinate attackers spawn at.
    #[serde(with = "decimal_serde")]
    pub spawn_x: Fixed,
    /// Lane-axis coordinate of the base; reaching it is a breach.
    #[serde(with = "decimal_serde")]
    pub base_x: Fixed,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            spawn_x: Fixed::from_num(6),
            base_x: Fixed::from_num(-6),
        }
    }
}

/// Everything needed to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Grid dimensions and cell geometry.
    pub grid: GridLayout,
    /// Ticks per simulated second.
    pub tick_rate: u32,
    /// Starting balances and passive income.
    pub economy: EconomyConfig,
    /// Spawn and base coordinates.
    pub lanes: LaneConfig,
    /// Attacker waves.
    pub waves: WavePlan,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid: GridLayout::default(),
            tick_rate: DEFAULT_TICK_RATE,
            economy: EconomyConfig::default(),
            lanes: LaneConfig::default(),
            waves: WavePlan::default(),
        }
    }
}

impl SessionConfig {
    /// Seconds per tick. Zero when the tick rate is zero or too large to
    /// represent.
    #[must_use]
    pub fn tick_duration(&self) -> Fixed {
        match Fixed::checked_from_num(self.tick_rate) {
            Some(rate) if rate > Fixed::ZERO => Fixed::ONE / rate,
            _ => Fixed::ZERO,
        }
    }

    /// Check every section for values the simulation cannot run with.
    ///
    /// Wave contents are checked against a catalog separately, see
    /// [`WavePlan::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(GameError::InvalidConfig(
                "tick_rate must be positive".to_string(),
            ));
        }
        if self.tick_rate > MAX_TICK_RATE {
            return Err(GameError::InvalidConfig(format!(
                "tick_rate {} exceeds {MAX_TICK_RATE}",
                self.tick_rate
            )));
        }
        self.grid.validate()?;
        self.economy.validate()?;
        if self.lanes.spawn_x <= self.lanes.base_x {
            return Err(GameError::InvalidConfig(format!(
                "spawn_x ({}) must lie beyond base_x ({})",
                self.lanes.spawn_x, self.lanes.base_x
            )));
        }
        Ok(())
    }

    /// Parse a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed RON. The result
    /// is not validated.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<session config>".to_string(),
            message: e.to_string(),
        })
    }
}
