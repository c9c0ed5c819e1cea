//! In-flight projectiles.
//!
//! Ranged units launch projectiles carrying their attack damage. Each tick
//! a projectile ages by the tick duration and then moves:
//!
//! - **Ballistic** projectiles travel a fixed direction chosen at launch.
//!   The swept segment of the step is tested against every living unit of
//!   the target faction; the earliest contact along the path is hit, with
//!   ties going to the lower unit id.
//! - **Homing** projectiles steer toward their target's current position
//!   and hit once within the hit radius. If the target is gone or dead the
//!   projectile despawns without dealing damage.
//!
//! A projectile whose age reaches its lifetime expires without damage.
//! Hits flip `has_hit` exactly once, deal damage in the same step, and the
//! projectile is removed at the end of the pass.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battlefield::Battlefield;
use crate::combat::apply_damage;
use crate::components::{Faction, Guidance, ProjectileId, ProjectileSpec, UnitId, UnitRecord};
use crate::math::{fixed_serde, segment_point_distance_squared, Fixed, Vec2Fixed};
use crate::registry::UnitRegistry;

/// How a projectile chooses where to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flight {
    /// Fixed unit direction.
    Ballistic {
        /// Normalized travel direction.
        direction: Vec2Fixed,
    },
    /// Tracks a unit.
    Homing {
        /// Tracked unit.
        target: UnitId,
    },
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Identifier.
    pub id: ProjectileId,
    /// Unit that fired it.
    pub owner: UnitId,
    /// Only units of this faction can be hit.
    pub target_faction: Faction,
    /// Current position.
    pub position: Vec2Fixed,
    /// Steering policy.
    pub flight: Flight,
    /// World units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage dealt on hit.
    pub damage: u32,
    /// Seconds since launch.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Seconds until expiry.
    #[serde(with = "fixed_serde")]
    pub max_lifetime: Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub hit_radius: Fixed,
    has_hit: bool,
}

impl Projectile {
    /// Whether this projectile has already delivered its damage.
    #[must_use]
    pub const fn has_hit(&self) -> bool {
        self.has_hit
    }

    /// Mark the projectile as having hit.
    ///
    /// Returns `true` only the first time; callers deal damage only then.
    pub fn mark_hit(&mut self) -> bool {
        if self.has_hit {
            return false;
        }
        self.has_hit = true;
        true
    }

    /// Whether the projectile has outlived its lifetime.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.max_lifetime
    }
}

/// What happened to a projectile during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepResult {
    Flying,
    Hit(UnitId),
    Expired,
    LostTarget,
}

/// Owner of all in-flight projectiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectileSystem {
    active: Vec<Projectile>,
    next_id: ProjectileId,
}

impl Default for ProjectileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectileSystem {
    /// Create an empty system.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: Vec::new(),
            next_id: 1,
        }
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Projectiles in launch order.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> + '_ {
        self.active.iter()
    }

    /// Remove every projectile.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Launch a projectile from `shooter` at `target`.
    pub fn launch(
        &mut self,
        shooter: &UnitRecord,
        target: &UnitRecord,
        damage: u32,
        spec: ProjectileSpec,
    ) -> ProjectileId {
        let id = self.next_id;
        self.next_id += 1;
        let flight = match spec.guidance {
            Guidance::Ballistic => Flight::Ballistic {
                direction: (target.position - shooter.position).normalize(),
            },
            Guidance::Homing => Flight::Homing { target: target.id },
        };
        self.active.push(Projectile {
            id,
            owner: shooter.id,
            target_faction: target.faction,
            position: shooter.position,
            flight,
            speed: spec.speed,
            damage,
            elapsed: Fixed::ZERO,
            max_lifetime: spec.max_lifetime,
            hit_radius: spec.hit_radius,
            has_hit: false,
        });
        id
    }
}

/// Counts from one projectile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectileOutcome {
    /// Projectiles that dealt damage.
    pub hits: u32,
    /// Projectiles that timed out.
    pub expired: u32,
    /// Homing projectiles whose target disappeared.
    pub lost: u32,
}

/// Advance every projectile by `dt` and resolve hits.
pub fn run_projectiles(field: &mut Battlefield, dt: Fixed) -> ProjectileOutcome {
    let mut outcome = ProjectileOutcome::default();
    let flights = std::mem::take(&mut field.projectiles.active);
    let mut still_flying = Vec::with_capacity(flights.len());

    for mut projectile in flights {
        match step(&mut projectile, &field.units, dt) {
            StepResult::Flying => still_flying.push(projectile),
            StepResult::Hit(target) => {
                if projectile.mark_hit() {
                    debug!(projectile = projectile.id, target, "Projectile hit");
                    apply_damage(field, Some(projectile.owner), target, projectile.damage);
                    outcome.hits += 1;
                }
            }
            StepResult::Expired => outcome.expired += 1,
            StepResult::LostTarget => outcome.lost += 1,
        }
    }

    field.projectiles.active = still_flying;
    field.units.flush_removals();
    outcome
}

fn step(projectile: &mut Projectile, units: &UnitRegistry, dt: Fixed) -> StepResult {
    projectile.elapsed += dt;
    if projectile.is_expired() {
        return StepResult::Expired;
    }

    let travel = projectile.speed * dt;
    let radius_sq = projectile.hit_radius.saturating_mul(projectile.hit_radius);

    match projectile.flight {
        Flight::Homing { target } => {
            let Some(unit) = units.get(target).filter(|u| u.is_alive()) else {
                return StepResult::LostTarget;
            };
            projectile.position = projectile.position.step_toward(unit.position, travel);
            if projectile.position.distance_squared(unit.position) <= radius_sq {
                StepResult::Hit(target)
            } else {
                StepResult::Flying
            }
        }
        Flight::Ballistic { direction } => {
            let start = projectile.position;
            let end = start + direction.scale(travel);
            projectile.position = end;

            let mut best: Option<(Fixed, UnitId)> = None;
            for unit in units.alive_units_of(projectile.target_faction) {
                let (dist_sq, t) = segment_point_distance_squared(start, end, unit.position);
                if dist_sq > radius_sq {
                    continue;
                }
                match best {
                    Some((best_t, _)) if t >= best_t => {}
                    _ => best = Some((t, unit.id)),
                }
            }
            best.map_or(StepResult::Flying, |(_, id)| StepResult::Hit(id))
        }
    }
}
