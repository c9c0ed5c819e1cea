//! Batch runner for wave balance testing.
//!
//! Plays one scenario under many wave seeds in parallel using rayon and
//! aggregates the outcomes.

use std::path::Path;
use std::time::Instant;

use lane_core::components::Faction;
use lane_core::events::SimEvent;
use lane_core::state::GameState;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of games to run.
    pub game_count: u32,
    /// Seed of the first game; game `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Tick limit per game.
    pub max_ticks: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            seed_start: 0,
            max_ticks: 32 * 60 * 10, // 10 minutes at 32 tps
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` games.
    #[must_use]
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// How a single game finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every wave cleared.
    Victory,
    /// Base breached.
    Defeat,
    /// Tick limit reached first.
    Unfinished,
}

/// Metrics for one finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Wave seed.
    pub seed: u64,
    /// Result.
    pub outcome: Outcome,
    /// Ticks simulated.
    pub ticks: u64,
    /// Waves started.
    pub waves_reached: u32,
    /// Attackers killed.
    pub attackers_killed: u32,
    /// Defenders lost.
    pub defenders_lost: u32,
    /// Energy at the end.
    pub final_energy: u32,
    /// Gold at the end.
    pub final_gold: u32,
    /// State hash at the end.
    pub final_hash: u64,
}

/// Play `scenario` until it ends or `max_ticks` elapse.
///
/// The session is started if the scenario does not start itself.
pub fn run_game(scenario: &Scenario, max_ticks: u64) -> Result<GameSummary, ScenarioError> {
    let mut sim = scenario.build_simulation()?;
    if sim.state() == GameState::Preparing {
        sim.request_state_transition(lane_core::state::Signal::Start)
            .map_err(lane_core::error::GameError::from)?;
    }

    let mut attackers_killed = 0;
    let mut defenders_lost = 0;
    while sim.get_tick() < max_ticks && sim.state().is_running() {
        let tick = sim.tick();
        for event in &tick.events {
            if let SimEvent::UnitDied { faction, .. } = event {
                match faction {
                    Faction::Attacker => attackers_killed += 1,
                    Faction::Defender => defenders_lost += 1,
                }
            }
        }
    }

    let outcome = match sim.state() {
        GameState::Victory => Outcome::Victory,
        GameState::Defeat => Outcome::Defeat,
        _ => Outcome::Unfinished,
    };
    debug!(
        seed = scenario.config.waves.seed,
        ?outcome,
        tick = sim.get_tick(),
        "Game finished"
    );

    Ok(GameSummary {
        seed: scenario.config.waves.seed,
        outcome,
        ticks: sim.get_tick(),
        waves_reached: sim.waves().current_wave(),
        attackers_killed,
        defenders_lost,
        final_energy: sim.ledger().energy(),
        final_gold: sim.ledger().gold(),
        final_hash: sim.state_hash(),
    })
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games that ended in victory.
    pub victories: u32,
    /// Games that ended in defeat.
    pub defeats: u32,
    /// Games that hit the tick limit.
    pub unfinished: u32,
    /// Share of finished-or-not games won.
    pub win_rate: f64,
    /// Mean ticks per game.
    pub mean_ticks: f64,
}

impl BatchSummary {
    /// Summarize a set of games.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_games(games: &[GameSummary]) -> Self {
        let mut summary = Self::default();
        for game in games {
            match game.outcome {
                Outcome::Victory => summary.victories += 1,
                Outcome::Defeat => summary.defeats += 1,
                Outcome::Unfinished => summary.unfinished += 1,
            }
        }
        if !games.is_empty() {
            let count = games.len() as f64;
            summary.win_rate = f64::from(summary.victories) / count;
            summary.mean_ticks = games.iter().map(|g| g.ticks as f64).sum::<f64>() / count;
        }
        summary
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-game metrics, in seed order.
    pub games: Vec<GameSummary>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Errors encountered.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run a batch of games across consecutive seeds.
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, scenario.name
    );

    let results: Vec<Result<GameSummary, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            run_game(&scenario.with_seed(seed), config.max_ticks).map_err(|e| {
                warn!("Game with seed {} failed: {}", seed, e);
                BatchError {
                    seed,
                    message: e.to_string(),
                }
            })
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        "Batch complete: {} games in {:.1}s ({} won, {} lost, {} unfinished)",
        games.len(),
        duration_seconds,
        summary.victories,
        summary.defeats,
        summary.unfinished
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Play the same seed `runs` times in parallel and compare final state.
///
/// Returns the common final hash, or `None` if any run diverged.
pub fn verify_determinism(
    scenario: &Scenario,
    runs: u32,
    max_ticks: u64,
) -> Result<Option<u64>, ScenarioError> {
    let results: Vec<Result<GameSummary, ScenarioError>> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_game(scenario, max_ticks))
        .collect();

    let mut summaries = Vec::with_capacity(results.len());
    for result in results {
        summaries.push(result?);
    }

    let first = &summaries[0];
    for (i, other) in summaries.iter().enumerate().skip(1) {
        if other != first {
            warn!(
                run = i,
                expected = first.final_hash,
                actual = other.final_hash,
                "Runs diverged"
            );
            return Ok(None);
        }
    }
    Ok(Some(first.final_hash))
}
