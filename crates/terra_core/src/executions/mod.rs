//! Gameplay executions.
//!
//! Every execution is an explicit state machine. Unit-driving executions
//! share the same outline: `Unspawned` until their [`UnitSource`] resolves
//! to a live unit, one or more active states, and a terminal state that
//! is never left. Losing the unit from the registry at any point goes
//! straight to the terminal state.

mod air_defense;
mod bomb;
mod bomber;
mod construction;
mod fighter;
mod interceptor;
mod missile;
mod shell;
mod spawn;
mod transport;
mod warship;

pub use air_defense::AirDefenseExecution;
pub use bomb::BombExecution;
pub use bomber::BomberExecution;
pub use construction::ConstructionExecution;
pub use fighter::FighterExecution;
pub use interceptor::InterceptorExecution;
pub use missile::MissileExecution;
pub use shell::ShellExecution;
pub use spawn::SpawnExecution;
pub use transport::TransportShipExecution;
pub use warship::WarshipExecution;

use rand::Rng;

use crate::config::BlastConfig;
use crate::execution::UnitSource;
use crate::map::{GameMap, TileRef};
use crate::math::Fixed;
use crate::movers::{AirMover, MoverStep};
use crate::pathfinding::{PathFinder, PathStep};
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};
use crate::world::{GameEvent, World};

/// Outcome of one attempt to resolve a [`UnitSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpawnAttempt {
    /// The unit exists now.
    Spawned(UnitId),
    /// Rejected; try again next tick.
    Retry,
    /// Rejected for good.
    Failed,
}

/// Try to turn `source` into a live unit of `kind`.
///
/// `failed_attempts` counts earlier rejections; once it reaches the
/// configured retry limit the next rejection is final and the owner gets
/// an advisory.
pub(crate) fn attempt_spawn(
    world: &mut World,
    kind: UnitKind,
    source: UnitSource,
    failed_attempts: u32,
) -> SpawnAttempt {
    match source {
        UnitSource::Existing(id) => match world.unit(id) {
            Some(unit) if unit.kind == kind => SpawnAttempt::Spawned(id),
            _ => {
                tracing::warn!(unit = id, ?kind, "existing unit missing or of the wrong kind");
                SpawnAttempt::Failed
            }
        },
        UnitSource::Spawn(request) => {
            match world.can_build(request.owner, kind, request.tile) {
                Some(tile) => SpawnAttempt::Spawned(world.build_unit(request.owner, kind, tile)),
                None if failed_attempts < world.config().spawn_retry_limit => SpawnAttempt::Retry,
                None => {
                    world.advise(request.owner, format!("cannot build {kind:?} at {}", request.tile));
                    SpawnAttempt::Failed
                }
            }
        }
    }
}

/// Convert a whole-tile config speed to fixed point.
pub(crate) fn fixed_speed(speed: u32) -> Fixed {
    Fixed::from_num(speed)
}

/// Draw a random tile within `range` of `centre` that satisfies `accept`.
///
/// Gives up after `attempts` draws.
pub(crate) fn random_tile_near<R: Rng + ?Sized>(
    map: &dyn GameMap,
    rng: &mut R,
    centre: TileRef,
    range: u32,
    attempts: u32,
    accept: impl Fn(TileRef) -> bool,
) -> Option<TileRef> {
    random_tile_in_band(map, rng, centre, 0, range, attempts, accept)
}

/// Draw a random tile whose Euclidean distance from `centre` lies in
/// `[min, max]` and that satisfies `accept`.
///
/// Gives up after `attempts` draws.
pub(crate) fn random_tile_in_band<R: Rng + ?Sized>(
    map: &dyn GameMap,
    rng: &mut R,
    centre: TileRef,
    min: u32,
    max: u32,
    attempts: u32,
    accept: impl Fn(TileRef) -> bool,
) -> Option<TileRef> {
    let (cx, cy) = (i64::from(map.x(centre)), i64::from(map.y(centre)));
    let (min_sq, max_sq) = (u64::from(min).pow(2), u64::from(max).pow(2));
    let reach = i64::from(max);

    for _ in 0..attempts {
        let x = cx + rng.gen_range(-reach..=reach);
        let y = cy + rng.gen_range(-reach..=reach);
        let Some(tile) = map.try_tile_ref(x, y) else {
            continue;
        };
        let dist_sq = map.euclidean_dist_squared(centre, tile);
        if dist_sq >= min_sq && dist_sq <= max_sq && accept(tile) {
            return Some(tile);
        }
    }
    None
}

/// Move an aircraft up to `steps` tiles toward `destination`.
///
/// Returns true once it is on the destination.
pub(crate) fn fly_toward<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    unit: UnitId,
    destination: TileRef,
    steps: u32,
) -> bool {
    let Some(mut current) = world.unit(unit).map(|u| u.tile) else {
        return false;
    };
    for _ in 0..steps.max(1) {
        match AirMover.next_tile(world.map(), rng, current, destination) {
            MoverStep::Next(tile) => current = tile,
            MoverStep::Arrived => {
                current = destination;
                break;
            }
        }
    }
    world.move_unit(unit, current);
    current == destination
}

/// Move a ship up to `steps` tiles along `pathfinder`'s route.
///
/// Returns the last step; [`PathStep::Completed`] once the ship is within
/// `close_enough` of `destination`.
pub(crate) fn sail(
    world: &mut World,
    pathfinder: &mut PathFinder,
    unit: UnitId,
    destination: TileRef,
    steps: u32,
    close_enough: u32,
) -> PathStep {
    let Some(mut current) = world.unit(unit).map(|u| u.tile) else {
        return PathStep::PathNotFound;
    };
    let mut last = PathStep::Pending;
    for _ in 0..steps.max(1) {
        last = pathfinder.next_tile(world.map(), current, destination, close_enough);
        match last {
            PathStep::Next(tile) => current = tile,
            _ => break,
        }
    }
    world.move_unit(unit, current);
    last
}

/// Damage everything within the blast radius of `tile`.
///
/// `source` is spared; with `spare_friendly` so are units friendly to
/// `owner`.
pub(crate) fn detonate(
    world: &mut World,
    kind: UnitKind,
    owner: PlayerId,
    source: UnitId,
    tile: TileRef,
    blast: BlastConfig,
    spare_friendly: bool,
) {
    let victims: Vec<UnitId> = world
        .units_in_range(tile, blast.radius)
        .into_iter()
        .filter(|u| u.id != source)
        .filter(|u| !(spare_friendly && world.is_friendly(owner, u.owner)))
        .map(|u| u.id)
        .collect();

    tracing::debug!(?kind, tile = %tile, victims = victims.len(), "detonation");
    world.emit(GameEvent::Detonation {
        kind,
        owner,
        tile,
        radius: blast.radius,
    });
    for id in victims {
        world.damage_unit(id, blast.damage);
    }
}
