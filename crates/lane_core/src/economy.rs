//! Energy and gold economy.
//!
//! Energy pays for defender placement and accrues on a fixed interval while
//! the session is playing. Gold is earned from attacker kills.
//!
//! # Invariants
//!
//! - Balances are unsigned and never go below zero.
//! - Spends are all-or-nothing: the full amount is deducted, or the ledger
//!   is left untouched and an error is returned.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed};

/// Starting balances and passive accrual rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Energy at session start and after restart.
    pub starting_energy: u32,
    /// Gold at session start and after restart.
    pub starting_gold: u32,
    /// Energy credited per accrual interval.
    pub energy_per_interval: u32,
    /// Seconds between passive energy credits.
    #[serde(with = "decimal_serde")]
    pub energy_interval: Fixed,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_energy: 50,
            starting_gold: 0,
            energy_per_interval: 10,
            energy_interval: Fixed::ONE,
        }
    }
}

impl EconomyConfig {
    /// Reject a non-positive accrual interval.
    pub fn validate(&self) -> Result<()> {
        if self.energy_interval <= Fixed::ZERO {
            return Err(GameError::InvalidConfig(
                "energy interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The two session currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Placement currency.
    Energy,
    /// Kill rewards.
    Gold,
}

impl ResourceKind {
    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Gold => "gold",
        }
    }
}

/// Energy and gold balances plus the accrual timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLedger {
    energy: u32,
    gold: u32,
    accrual_timer: Fixed,
    config: EconomyConfig,
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new(EconomyConfig::default())
    }
}

impl ResourceLedger {
    /// Create a ledger at the configured starting balances.
    #[must_use]
    pub const fn new(config: EconomyConfig) -> Self {
        Self {
            energy: config.starting_energy,
            gold: config.starting_gold,
            accrual_timer: Fixed::ZERO,
            config,
        }
    }

    /// Current energy.
    #[must_use]
    pub const fn energy(&self) -> u32 {
        self.energy
    }

    /// Current gold.
    #[must_use]
    pub const fn gold(&self) -> u32 {
        self.gold
    }

    /// Balance of either currency.
    #[must_use]
    pub const fn balance(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Energy => self.energy,
            ResourceKind::Gold => self.gold,
        }
    }

    /// Seconds accumulated toward the next passive credit.
    #[must_use]
    pub const fn accrual_timer(&self) -> Fixed {
        self.accrual_timer
    }

    /// Economy parameters.
    #[must_use]
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Whether `amount` energy could be spent right now.
    #[must_use]
    pub const fn can_afford_energy(&self, amount: u32) -> bool {
        self.energy >= amount
    }

    /// Whether `amount` gold could be spent right now.
    #[must_use]
    pub const fn can_afford_gold(&self, amount: u32) -> bool {
        self.gold >= amount
    }

    /// Credit energy. Returns `true` if the balance changed.
    pub fn add_energy(&mut self, amount: u32) -> bool {
        self.add(ResourceKind::Energy, amount)
    }

    /// Credit gold. Returns `true` if the balance changed.
    pub fn add_gold(&mut self, amount: u32) -> bool {
        self.add(ResourceKind::Gold, amount)
    }

    /// Spend energy, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] and leaves the ledger
    /// unchanged if the balance is below `amount`.
    pub fn spend_energy(&mut self, amount: u32) -> Result<()> {
        self.spend(ResourceKind::Energy, amount)
    }

    /// Spend gold, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] and leaves the ledger
    /// unchanged if the balance is below `amount`.
    pub fn spend_gold(&mut self, amount: u32) -> Result<()> {
        self.spend(ResourceKind::Gold, amount)
    }

    fn slot(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Energy => &mut self.energy,
            ResourceKind::Gold => &mut self.gold,
        }
    }

    fn add(&mut self, kind: ResourceKind, amount: u32) -> bool {
        let slot = self.slot(kind);
        let before = *slot;
        *slot = before.saturating_add(amount);
        *slot != before
    }

    fn spend(&mut self, kind: ResourceKind, amount: u32) -> Result<()> {
        let slot = self.slot(kind);
        let available = *slot;
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| GameError::InsufficientResources {
                    resource: kind.name().to_string(),
                    required: amount,
                    available,
                })?;
        *slot = remaining;
        Ok(())
    }

    /// Advance the accrual timer by `dt` seconds and credit passive energy.
    ///
    /// The interval is subtracted rather than the timer reset, so long
    /// ticks carry their remainder into the next interval. Returns the
    /// energy credited.
    pub fn accrue(&mut self, dt: Fixed) -> u32 {
        let interval = self.config.energy_interval;
        if interval <= Fixed::ZERO {
            return 0;
        }
        self.accrual_timer += dt;
        let mut credited = 0u32;
        while self.accrual_timer >= interval {
            self.accrual_timer -= interval;
            credited = credited.saturating_add(self.config.energy_per_interval);
        }
        self.add_energy(credited);
        credited
    }

    /// Return to the configured starting balances.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
