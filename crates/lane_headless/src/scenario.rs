//! Scenario loading and session setup.
//!
//! A scenario bundles a [`SessionConfig`], an optional unit catalog file,
//! and the defenders placed before the first tick.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "Two lanes",
//!     config: (
//!         waves: (
//!             waves: [(attackers: [(unit_type: "grunt", count: 3)], lanes: Fixed(1))],
//!         ),
//!     ),
//!     placements: [(unit_type: "shooter", row: 1, col: 0)],
//!     auto_start: true,
//! )
//! ```

use std::path::{Path, PathBuf};

use lane_core::config::SessionConfig;
use lane_core::data::UnitCatalog;
use lane_core::error::{GameError, PlacementError};
use lane_core::simulation::Simulation;
use lane_core::state::Signal;
use lane_core::waves::{WavePlan, WaveSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Config, catalog or wave plan rejected by the simulation.
    #[error(transparent)]
    Game(#[from] GameError),
    /// A starting placement was rejected.
    #[error("Placement #{index} ({unit_type}) rejected: {source}")]
    Placement {
        /// Position in the placement list.
        index: usize,
        /// Requested unit type.
        unit_type: String,
        /// Why it failed.
        source: PlacementError,
    },
}

/// A defender placed before the session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingPlacement {
    /// Catalog id of a defender type.
    pub unit_type: String,
    /// Grid row (lane).
    pub row: u32,
    /// Grid column.
    pub col: u32,
}

impl StartingPlacement {
    /// Create a placement.
    pub fn new(unit_type: &str, row: u32, col: u32) -> Self {
        Self {
            unit_type: unit_type.to_string(),
            row,
            col,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Grid, economy, lanes and waves.
    #[serde(default)]
    pub config: SessionConfig,
    /// Unit catalog file, relative to the scenario file. Built-in catalog if absent.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Defenders placed in order before the first tick.
    #[serde(default)]
    pub placements: Vec<StartingPlacement>,
    /// Send the start signal after placing.
    #[serde(default)]
    pub auto_start: bool,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Empty Field".to_string(),
            description: "Default grid and economy with no waves".to_string(),
            config: SessionConfig::default(),
            catalog: None,
            placements: Vec::new(),
            auto_start: false,
            base_dir: None,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        scenario.base_dir = path.parent().map(Path::to_path_buf);
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// A relative catalog path is resolved against the working directory.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Standard five-lane skirmish on the built-in catalog.
    ///
    /// Three budgeted waves against a guard and shooter in every lane.
    #[must_use]
    pub fn skirmish() -> Self {
        let mut waves = WavePlan::new(vec![
            WaveSpec::default().with_budget(6),
            WaveSpec::default().with_budget(10),
            WaveSpec::default().with_budget(16),
        ]);
        waves.initial_delay = lane_core::math::Fixed::from_num(5);

        let mut config = SessionConfig {
            waves,
            ..SessionConfig::default()
        };
        config.economy.starting_energy = 800;

        let mut placements = Vec::new();
        for row in 0..config.grid.rows {
            placements.push(StartingPlacement::new("shooter", row, 0));
            placements.push(StartingPlacement::new("guard", row, 2));
        }
        placements.push(StartingPlacement::new("energy_generator", 2, 1));

        Self {
            name: "Standard Skirmish".to_string(),
            description: "Three budgeted waves against a two-column defense".to_string(),
            config,
            catalog: None,
            placements,
            auto_start: true,
            base_dir: None,
        }
    }

    /// Copy of this scenario with the wave seed replaced.
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> Self {
        let mut scenario = self.clone();
        scenario.config.waves.seed = seed;
        scenario
    }

    /// Resolve a scenario argument: a path to a RON file, or `skirmish`
    /// / `empty` for the built-in scenarios.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "skirmish" => Ok(Self::skirmish()),
            "empty" => Ok(Self::default()),
            path => Self::load(path),
        }
    }

    /// Path of the catalog file, if the scenario names one.
    #[must_use]
    pub fn catalog_path(&self) -> Option<PathBuf> {
        let catalog = self.catalog.as_ref()?;
        Some(match &self.base_dir {
            Some(dir) if catalog.is_relative() => dir.join(catalog),
            _ => catalog.clone(),
        })
    }

    /// Load the unit catalog this scenario plays with.
    pub fn load_catalog(&self) -> Result<UnitCatalog, ScenarioError> {
        let Some(path) = self.catalog_path() else {
            return Ok(UnitCatalog::builtin());
        };
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(&path)?;
        let catalog = UnitCatalog::from_ron_str(&contents, &path.display().to_string())?;
        Ok(catalog)
    }

    /// Build a simulation with the starting placements applied.
    pub fn build_simulation(&self) -> Result<Simulation, ScenarioError> {
        let catalog = self.load_catalog()?;
        let mut sim = Simulation::with_config(self.config.clone(), catalog)?;

        for (index, placement) in self.placements.iter().enumerate() {
            sim.request_placement(&placement.unit_type, placement.row, placement.col)
                .map_err(|source| ScenarioError::Placement {
                    index,
                    unit_type: placement.unit_type.clone(),
                    source,
                })?;
        }

        if self.auto_start {
            sim.request_state_transition(Signal::Start)
                .map_err(GameError::from)?;
        }

        tracing::info!(
            scenario = %self.name,
            defenders = self.placements.len(),
            waves = self.config.waves.waves.len(),
            "Scenario ready"
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::state::GameState;

    #[test]
    fn test_default_scenario_builds() {
        let sim = Scenario::default().build_simulation().unwrap();
        assert_eq!(sim.state(), GameState::Preparing);
        assert!(sim.units().is_empty());
    }

    #[test]
    fn test_skirmish_builds_and_starts() {
        let scenario = Scenario::skirmish();
        let sim = scenario.build_simulation().unwrap();
        assert_eq!(sim.state(), GameState::Playing);
        assert_eq!(sim.units().len(), scenario.placements.len());
        assert_eq!(sim.waves().total_waves(), 3);
    }

    #[test]
    fn test_from_ron_str_minimal() {
        let scenario = Scenario::from_ron_str(r#"(name: "bare")"#).unwrap();
        assert_eq!(scenario.name, "bare");
        assert!(scenario.placements.is_empty());
        assert!(!scenario.auto_start);
        assert_eq!(scenario.config, SessionConfig::default());
    }

    #[test]
    fn test_from_ron_str_full() {
        let ron = r#"
            Scenario(
                name: "Lane two",
                config: (
                    economy: (starting_energy: 500),
                    waves: (
                        waves: [(attackers: [(unit_type: "grunt", count: 2)], lanes: Fixed(2))],
                        seed: 9,
                    ),
                ),
                placements: [(unit_type: "shooter", row: 2, col: 0)],
                auto_start: true,
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.config.economy.starting_energy, 500);
        assert_eq!(scenario.config.waves.seed, 9);

        let sim = scenario.build_simulation().unwrap();
        assert_eq!(sim.ledger().energy(), 400);
        assert_eq!(sim.state(), GameState::Playing);
    }

    #[test]
    fn test_bad_placement_reports_index() {
        let mut scenario = Scenario::default();
        scenario.config.economy.starting_energy = 1000;
        scenario.placements = vec![
            StartingPlacement::new("guard", 0, 0),
            StartingPlacement::new("guard", 0, 0),
        ];
        let err = scenario.build_simulation().unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Placement {
                index: 1,
                source: PlacementError::CellOccupied { row: 0, col: 0 },
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_wave_unit_rejected() {
        let mut scenario = Scenario::default();
        scenario.config.waves = WavePlan::new(vec![WaveSpec::of(vec![
            lane_core::waves::WaveEntry::new("dragon", 1),
        ])]);
        assert!(matches!(
            scenario.build_simulation(),
            Err(ScenarioError::Game(GameError::UnknownUnitType(_)))
        ));
    }

    #[test]
    fn test_with_seed_only_changes_seed() {
        let base = Scenario::skirmish();
        let seeded = base.with_seed(77);
        assert_eq!(seeded.config.waves.seed, 77);
        assert_eq!(seeded.placements, base.placements);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/definitely/not/here.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
