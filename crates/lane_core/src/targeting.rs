//! Lane-scoped target selection.
//!
//! Pure queries over the registry with no hidden state. Candidates must be
//! alive, of the opposite faction and in the seeker's lane. Attackers only
//! consider defenders they have not yet passed (strictly lower `x`).
//!
//! The nearest candidate wins, compared by squared distance. Candidates
//! are scanned in ascending id order and only a strictly closer one
//! replaces the current best, so equal distances resolve to the lower id.

use crate::components::{Faction, UnitId, UnitRecord};
use crate::registry::UnitRegistry;

/// Whether `candidate` is a legal target for `seeker`.
#[must_use]
pub fn is_eligible(seeker: &UnitRecord, candidate: &UnitRecord) -> bool {
    if candidate.id == seeker.id
        || !candidate.is_alive()
        || candidate.faction != seeker.faction.opposite()
        || candidate.lane != seeker.lane
    {
        return false;
    }
    match seeker.faction {
        Faction::Defender => true,
        Faction::Attacker => candidate.position.x < seeker.position.x,
    }
}

/// Whether `target` still refers to a legal target for `seeker`.
#[must_use]
pub fn is_valid_target(units: &UnitRegistry, seeker: &UnitRecord, target: UnitId) -> bool {
    units
        .get(target)
        .is_some_and(|candidate| is_eligible(seeker, candidate))
}

/// Nearest eligible target for `seeker`, if any.
#[must_use]
pub fn find_target(units: &UnitRegistry, seeker: &UnitRecord) -> Option<UnitId> {
    let mut best: Option<(UnitId, _)> = None;
    for candidate in units.alive_units_of(seeker.faction.opposite()) {
        if !is_eligible(seeker, candidate) {
            continue;
        }
        let dist_sq = seeker.distance_squared_to(candidate);
        match best {
            Some((_, best_dist)) if dist_sq >= best_dist => {}
            _ => best = Some((candidate.id, dist_sq)),
        }
    }
    best.map(|(id, _)| id)
}
