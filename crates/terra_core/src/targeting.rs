//! Target selection shared by every attacking execution.
//!
//! Candidates within range are filtered (friendly, untargetable, already
//! claimed by a sibling) and ranked by kind priority first, then squared
//! distance, then id. Priority always wins over distance.

use std::collections::BTreeSet;

use crate::map::TileRef;
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};
use crate::world::World;

/// Fighter targets, highest priority first.
pub const FIGHTER_PRIORITIES: &[UnitKind] = &[UnitKind::Bomber, UnitKind::Fighter, UnitKind::Missile];

/// Bomber targets, highest priority first.
pub const BOMBER_PRIORITIES: &[UnitKind] = &[
    UnitKind::AirDefense,
    UnitKind::Airfield,
    UnitKind::MissileSilo,
    UnitKind::Port,
    UnitKind::City,
    UnitKind::Construction,
];

/// Warship targets, highest priority first.
pub const WARSHIP_PRIORITIES: &[UnitKind] = &[UnitKind::TransportShip, UnitKind::Warship];

/// Air defense targets, highest priority first.
pub const AIR_DEFENSE_PRIORITIES: &[UnitKind] = &[UnitKind::Missile, UnitKind::Bomber];

/// Parameters for one target search.
#[derive(Debug, Clone, Copy)]
pub struct TargetQuery<'a> {
    /// The searching unit, never selected itself.
    pub seeker: Option<UnitId>,
    /// Owner of the searching unit.
    pub owner: PlayerId,
    /// Search centre.
    pub origin: TileRef,
    /// Search radius in tiles.
    pub range: u32,
    /// Acceptable kinds, highest priority first.
    pub priorities: &'a [UnitKind],
    /// Units already engaged by siblings.
    pub claimed: &'a BTreeSet<UnitId>,
}

/// Position of `kind` in a priority list; lower is more important.
#[must_use]
pub fn priority_rank(priorities: &[UnitKind], kind: UnitKind) -> Option<usize> {
    priorities.iter().position(|&k| k == kind)
}

/// Pick the best target for `query`, if any.
#[must_use]
pub fn select_target(world: &World, query: &TargetQuery<'_>) -> Option<UnitId> {
    let map = world.map();
    world
        .units_in_range(query.origin, query.range)
        .into_iter()
        .filter(|u| Some(u.id) != query.seeker)
        .filter(|u| u.kind.is_targetable())
        .filter(|u| !world.is_friendly(query.owner, u.owner))
        .filter(|u| !query.claimed.contains(&u.id))
        .filter_map(|u| {
            let rank = priority_rank(query.priorities, u.kind)?;
            Some((rank, map.euclidean_dist_squared(query.origin, u.tile), u.id))
        })
        .min()
        .map(|(_, _, id)| id)
}
