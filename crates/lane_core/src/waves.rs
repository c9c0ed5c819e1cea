//! Attacker wave scheduling.
//!
//! A [`WavePlan`] lists waves. Each wave is a queue of attacker types,
//! built from explicit `(unit_type, count)` entries followed by weighted
//! draws from a point budget. The [`WaveDirector`] releases one queued
//! attacker every `spawn_interval` seconds, then waits `wave_delay`
//! before the next wave.
//!
//! All randomness (budget draws, random lanes) comes from a
//! [`ChaCha8Rng`] seeded from the plan, so a plan always produces the
//! same spawns.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::Faction;
use crate::data::{UnitCatalog, UnitData};
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed};

/// A fixed number of one attacker type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Catalog id.
    pub unit_type: String,
    /// How many to spawn.
    pub count: u32,
}

impl WaveEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(unit_type: impl Into<String>, count: u32) -> Self {
        Self {
            unit_type: unit_type.into(),
            count,
        }
    }
}

/// How a wave picks the lane for each attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LaneChoice {
    /// Uniformly random lane from the seeded generator.
    #[default]
    Random,
    /// Always the given lane.
    Fixed(u32),
    /// Lanes 0, 1, 2, ... in turn.
    Cycle,
}

/// One wave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveSpec {
    /// Explicit spawns, in order.
    #[serde(default)]
    pub attackers: Vec<WaveEntry>,
    /// Points spent on weighted draws after the explicit spawns.
    #[serde(default)]
    pub budget: u32,
    /// Seconds between spawns.
    #[serde(default = "default_spawn_interval", with = "decimal_serde")]
    pub spawn_interval: Fixed,
    /// Lane policy.
    #[serde(default)]
    pub lanes: LaneChoice,
}

fn default_spawn_interval() -> Fixed {
    Fixed::from_num(3)
}

impl Default for WaveSpec {
    fn default() -> Self {
        Self {
            attackers: Vec::new(),
            budget: 0,
            spawn_interval: default_spawn_interval(),
            lanes: LaneChoice::Random,
        }
    }
}

impl WaveSpec {
    /// Wave made of explicit entries only.
    #[must_use]
    pub fn of(attackers: Vec<WaveEntry>) -> Self {
        Self {
            attackers,
            ..Self::default()
        }
    }

    /// Set the lane policy.
    #[must_use]
    pub fn with_lanes(mut self, lanes: LaneChoice) -> Self {
        self.lanes = lanes;
        self
    }

    /// Set the spawn interval.
    #[must_use]
    pub fn with_spawn_interval(mut self, interval: Fixed) -> Self {
        self.spawn_interval = interval;
        self
    }

    /// Set the draw budget.
    #[must_use]
    pub fn with_budget(mut self, budget: u32) -> Self {
        self.budget = budget;
        self
    }
}

/// The full attacker schedule for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WavePlan {
    /// Waves in order.
    pub waves: Vec<WaveSpec>,
    /// Seconds before the first wave.
    #[serde(with = "decimal_serde")]
    pub initial_delay: Fixed,
    /// Seconds between the end of one wave and the start of the next.
    #[serde(with = "decimal_serde")]
    pub wave_delay: Fixed,
    /// Seed for budget draws and random lanes.
    pub seed: u64,
}

impl Default for WavePlan {
    fn default() -> Self {
        Self {
            waves: Vec::new(),
            initial_delay: Fixed::ZERO,
            wave_delay: Fixed::from_num(5),
            seed: 0,
        }
    }
}

impl WavePlan {
    /// Plan with the given waves and default timing.
    #[must_use]
    pub fn new(waves: Vec<WaveSpec>) -> Self {
        Self {
            waves,
            ..Self::default()
        }
    }

    /// Whether the plan has no waves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Check the plan against a catalog and lane count.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownUnitType`] for ids missing from the catalog,
    /// [`GameError::InvalidLane`] for fixed lanes off the grid and
    /// [`GameError::InvalidConfig`] for anything else.
    pub fn validate(&self, catalog: &UnitCatalog, lanes: u32) -> Result<()> {
        if self.initial_delay < Fixed::ZERO || self.wave_delay < Fixed::ZERO {
            return Err(GameError::InvalidConfig(
                "wave delays must not be negative".to_string(),
            ));
        }
        for (index, wave) in self.waves.iter().enumerate() {
            if wave.spawn_interval <= Fixed::ZERO {
                return Err(GameError::InvalidConfig(format!(
                    "wave {}: spawn_interval must be positive",
                    index + 1
                )));
            }
            if let LaneChoice::Fixed(lane) = wave.lanes {
                if lane >= lanes {
                    return Err(GameError::InvalidLane { lane, lanes });
                }
            }
            for entry in &wave.attackers {
                let unit = catalog
                    .get(&entry.unit_type)
                    .ok_or_else(|| GameError::UnknownUnitType(entry.unit_type.clone()))?;
                if unit.faction != Faction::Attacker {
                    return Err(GameError::InvalidConfig(format!(
                        "wave {}: '{}' is not an attacker",
                        index + 1,
                        entry.unit_type
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WavePhase {
    Waiting,
    Spawning,
    Finished,
}

/// What the director did during one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveStep {
    /// `(current, total)` when a wave started this step.
    pub started: Option<(u32, u32)>,
    /// Attackers to spawn: `(unit_type, lane)`.
    pub spawns: Vec<(String, u32)>,
}

/// Runs a [`WavePlan`].
#[derive(Debug, Clone)]
pub struct WaveDirector {
    plan: WavePlan,
    rng: ChaCha8Rng,
    phase: WavePhase,
    /// Waves started so far.
    started: u32,
    timer: Fixed,
    queue: VecDeque<String>,
    spawned_in_wave: u32,
}

impl WaveDirector {
    /// Director at the start of `plan`.
    #[must_use]
    pub fn new(plan: WavePlan) -> Self {
        let phase = if plan.is_empty() {
            WavePhase::Finished
        } else {
            WavePhase::Waiting
        };
        Self {
            rng: ChaCha8Rng::seed_from_u64(plan.seed),
            plan,
            phase,
            started: 0,
            timer: Fixed::ZERO,
            queue: VecDeque::new(),
            spawned_in_wave: 0,
        }
    }

    /// Rewind to the start of the plan, re-seeding the generator.
    pub fn reset(&mut self) {
        *self = Self::new(self.plan.clone());
    }

    /// The plan being run.
    #[must_use]
    pub fn plan(&self) -> &WavePlan {
        &self.plan
    }

    /// Number of waves in the plan.
    #[must_use]
    pub fn total_waves(&self) -> u32 {
        u32::try_from(self.plan.waves.len()).unwrap_or(u32::MAX)
    }

    /// One-based index of the latest started wave, zero before the first.
    #[must_use]
    pub const fn current_wave(&self) -> u32 {
        self.started
    }

    /// Attackers still queued in the running wave.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.queue.len()
    }

    /// Whether every wave has been fully emitted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == WavePhase::Finished
    }

    /// Advance by `dt` seconds. At most one attacker is released per step.
    pub fn step(&mut self, dt: Fixed, catalog: &UnitCatalog, lanes: u32) -> WaveStep {
        let mut step = WaveStep::default();

        match self.phase {
            WavePhase::Finished => return step,
            WavePhase::Waiting => {
                self.timer += dt;
                let delay = if self.started == 0 {
                    self.plan.initial_delay
                } else {
                    self.plan.wave_delay
                };
                if self.timer < delay {
                    return step;
                }
                step.started = Some(self.start_wave(catalog));
            }
            WavePhase::Spawning => self.timer += dt,
        }

        let Some(wave) = self.running_wave().cloned() else {
            self.phase = WavePhase::Finished;
            return step;
        };

        if self.timer >= wave.spawn_interval {
            self.timer -= wave.spawn_interval;
            if let Some(unit_type) = self.queue.pop_front() {
                let lane = self.pick_lane(wave.lanes, lanes);
                self.spawned_in_wave += 1;
                step.spawns.push((unit_type, lane));
            }
        }

        if self.queue.is_empty() {
            self.timer = Fixed::ZERO;
            self.phase = if self.started >= self.total_waves() {
                WavePhase::Finished
            } else {
                WavePhase::Waiting
            };
        }
        step
    }

    fn running_wave(&self) -> Option<&WaveSpec> {
        let index = usize::try_from(self.started).ok()?.checked_sub(1)?;
        self.plan.waves.get(index)
    }

    fn start_wave(&mut self, catalog: &UnitCatalog) -> (u32, u32) {
        self.started += 1;
        self.spawned_in_wave = 0;
        self.queue.clear();

        if let Some(wave) = self.running_wave().cloned() {
            for entry in &wave.attackers {
                for _ in 0..entry.count {
                    self.queue.push_back(entry.unit_type.clone());
                }
            }
            let drawn = self.draw_budget(catalog, wave.budget);
            self.queue.extend(drawn);
            // First attacker leaves as soon as the wave starts.
            self.timer = wave.spawn_interval;
        }

        self.phase = WavePhase::Spawning;
        let total = self.total_waves();
        info!(
            wave = self.started,
            total,
            attackers = self.queue.len(),
            "Wave started"
        );
        (self.started, total)
    }

    /// Weighted draws until nothing affordable is left.
    fn draw_budget(&mut self, catalog: &UnitCatalog, budget: u32) -> Vec<String> {
        let wave = self.started;
        let mut remaining = budget;
        let mut drawn = Vec::new();

        loop {
            let options: Vec<&UnitData> = catalog
                .of_faction(Faction::Attacker)
                .filter(|unit| unit.is_drawable(wave) && unit.point_cost <= remaining)
                .collect();
            let total_weight: u64 = options.iter().map(|unit| u64::from(unit.spawn_weight)).sum();
            if total_weight == 0 {
                break;
            }

            let mut roll = self.rng.gen_range(0..total_weight);
            let mut pick = None;
            for unit in options {
                let weight = u64::from(unit.spawn_weight);
                if roll < weight {
                    pick = Some(unit);
                    break;
                }
                roll -= weight;
            }
            let Some(unit) = pick else {
                break;
            };
            remaining -= unit.point_cost;
            drawn.push(unit.id.clone());
        }
        drawn
    }

    fn pick_lane(&mut self, choice: LaneChoice, lanes: u32) -> u32 {
        if lanes == 0 {
            return 0;
        }
        match choice {
            LaneChoice::Random => self.rng.gen_range(0..lanes),
            LaneChoice::Fixed(lane) => lane,
            LaneChoice::Cycle => self.spawned_in_wave % lanes,
        }
    }

    /// Feed the director's progress into a hasher.
    pub fn hash_state<H: Hasher>(&self, hasher: &mut H) {
        self.phase.hash(hasher);
        self.started.hash(hasher);
        self.timer.to_bits().hash(hasher);
        self.queue.hash(hasher);
        self.spawned_in_wave.hash(hasher);
        self.rng.get_word_pos().hash(hasher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitStats;

    fn catalog() -> UnitCatalog {
        UnitCatalog::builtin()
    }

    fn run(director: &mut WaveDirector, steps: usize, dt: Fixed) -> Vec<WaveStep> {
        (0..steps)
            .map(|_| director.step(dt, &catalog(), 5))
            .collect()
    }

    #[test]
    fn test_empty_plan_is_finished() {
        let mut director = WaveDirector::new(WavePlan::default());
        assert!(director.is_finished());
        assert_eq!(director.step(Fixed::ONE, &catalog(), 5), WaveStep::default());
    }

    #[test]
    fn test_spawn_cadence() {
        let plan = WavePlan::new(vec![WaveSpec::of(vec![WaveEntry::new("grunt", 3)])
            .with_lanes(LaneChoice::Fixed(2))
            .with_spawn_interval(Fixed::from_num(2))]);
        let mut director = WaveDirector::new(plan);

        let steps = run(&mut director, 5, Fixed::ONE);
        assert_eq!(steps[0].started, Some((1, 1)));
        let spawn_steps: Vec<usize> = steps
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.spawns.is_empty())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(spawn_steps, vec![0, 2, 4]);
        assert!(steps
            .iter()
            .flat_map(|step| &step.spawns)
            .all(|(unit, lane)| unit == "grunt" && *lane == 2));
        assert!(director.is_finished());
    }

    #[test]
    fn test_wave_delay_between_waves() {
        let mut plan = WavePlan::new(vec![
            WaveSpec::of(vec![WaveEntry::new("grunt", 1)]),
            WaveSpec::of(vec![WaveEntry::new("grunt", 1)]),
        ]);
        plan.wave_delay = Fixed::from_num(2);
        let mut director = WaveDirector::new(plan);

        let steps = run(&mut director, 4, Fixed::ONE);
        assert_eq!(steps[0].started, Some((1, 2)));
        assert_eq!(steps[1].started, None);
        assert_eq!(steps[2].started, Some((2, 2)));
        assert_eq!(director.current_wave(), 2);
        assert!(director.is_finished());
    }

    #[test]
    fn test_cycle_lanes() {
        let plan = WavePlan::new(vec![WaveSpec::of(vec![WaveEntry::new("grunt", 4)])
            .with_lanes(LaneChoice::Cycle)
            .with_spawn_interval(Fixed::ONE)]);
        let mut director = WaveDirector::new(plan);
        let lanes: Vec<u32> = (0..4)
            .flat_map(|_| director.step(Fixed::ONE, &catalog(), 3).spawns)
            .map(|(_, lane)| lane)
            .collect();
        assert_eq!(lanes, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_budget_draws_are_seeded() {
        let mut plan = WavePlan::new(vec![WaveSpec::default().with_budget(12)]);
        plan.seed = 7;

        let mut a = WaveDirector::new(plan.clone());
        let mut b = WaveDirector::new(plan);
        let spawns_a: Vec<_> = run(&mut a, 40, Fixed::ONE)
            .into_iter()
            .flat_map(|s| s.spawns)
            .collect();
        let spawns_b: Vec<_> = run(&mut b, 40, Fixed::ONE)
            .into_iter()
            .flat_map(|s| s.spawns)
            .collect();
        assert_eq!(spawns_a, spawns_b);
        // Only grunts are tier 1, one point each.
        assert_eq!(spawns_a.len(), 12);
        assert!(spawns_a.iter().all(|(unit, lane)| unit == "grunt" && *lane < 5));
    }

    #[test]
    fn test_reset_replays() {
        let mut plan = WavePlan::new(vec![WaveSpec::default().with_budget(5)]);
        plan.seed = 99;
        let mut director = WaveDirector::new(plan);
        let first: Vec<_> = run(&mut director, 20, Fixed::ONE);
        director.reset();
        assert_eq!(director.current_wave(), 0);
        let second: Vec<_> = run(&mut director, 20, Fixed::ONE);
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate() {
        let catalog = catalog();
        let good = WavePlan::new(vec![WaveSpec::of(vec![WaveEntry::new("grunt", 1)])]);
        assert!(good.validate(&catalog, 5).is_ok());

        let unknown = WavePlan::new(vec![WaveSpec::of(vec![WaveEntry::new("dragon", 1)])]);
        assert!(matches!(
            unknown.validate(&catalog, 5),
            Err(GameError::UnknownUnitType(_))
        ));

        let defender = WavePlan::new(vec![WaveSpec::of(vec![WaveEntry::new("guard", 1)])]);
        assert!(defender.validate(&catalog, 5).is_err());

        let lane = WavePlan::new(vec![WaveSpec::default().with_lanes(LaneChoice::Fixed(5))]);
        assert!(matches!(
            lane.validate(&catalog, 5),
            Err(GameError::InvalidLane { lane: 5, lanes: 5 })
        ));
    }

    #[test]
    fn test_budget_respects_tier() {
        let mut catalog = UnitCatalog::new();
        let mut elite = UnitData::new("elite", Faction::Attacker, UnitStats::default());
        elite.tier = 2;
        catalog.insert(elite).unwrap();

        let plan = WavePlan::new(vec![WaveSpec::default().with_budget(3)]);
        let mut director = WaveDirector::new(plan);
        let step = director.step(Fixed::ONE, &catalog, 5);
        assert_eq!(step.started, Some((1, 1)));
        assert!(step.spawns.is_empty());
        assert!(director.is_finished());
    }
}
