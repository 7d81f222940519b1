//! Fighter patrols and dogfights.
//!
//! A fighter patrols random tiles around its home airfield until a hostile
//! bomber, fighter or missile comes within targeting range. It then closes
//! in and, once inside the dogfight band, orbits random points around the
//! target (no closer than the safe distance, no further than attack range)
//! instead of sitting on top of it, firing shells whenever the gun is
//! ready and the target is within attack range. The target is dropped
//! when it dies, turns friendly or escapes targeting range.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{
    attempt_spawn, fly_toward, random_tile_in_band, random_tile_near, ShellExecution,
    SpawnAttempt,
};
use crate::config::FighterConfig;
use crate::execution::{Execution, ExecutionContext, UnitSource};
use crate::map::{GameMap, TileRef};
use crate::movers::{AirMover, MoverStep};
use crate::players::PlayerId;
use crate::targeting::{select_target, TargetQuery, FIGHTER_PRIORITIES};
use crate::units::{UnitId, UnitKind};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FighterState {
    Unspawned {
        source: UnitSource,
        failed_attempts: u32,
    },
    Patrolling {
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
        waypoint: Option<TileRef>,
    },
    Attacking {
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
        target: UnitId,
        orbit: Option<TileRef>,
    },
    Done,
}

/// Drives one fighter for as long as it lives.
#[derive(Debug)]
pub struct FighterExecution {
    state: FighterState,
    rng: ChaCha8Rng,
    ticks_since_fire: u32,
}

impl FighterExecution {
    /// Control the fighter described by `source`.
    #[must_use]
    pub fn new(source: UnitSource) -> Self {
        Self {
            state: FighterState::Unspawned {
                source,
                failed_attempts: 0,
            },
            rng: ChaCha8Rng::seed_from_u64(0),
            ticks_since_fire: 0,
        }
    }

    /// The unit currently engaged, if any.
    #[must_use]
    pub fn target(&self) -> Option<UnitId> {
        match self.state {
            FighterState::Attacking { target, .. } => Some(target),
            _ => None,
        }
    }

    fn try_spawn(&mut self, world: &mut World, source: UnitSource, failed_attempts: u32) {
        self.state = match attempt_spawn(world, UnitKind::Fighter, source, failed_attempts) {
            SpawnAttempt::Spawned(unit) => match world.unit(unit) {
                Some(fighter) => FighterState::Patrolling {
                    unit,
                    owner: fighter.owner,
                    home: fighter.tile,
                    waypoint: None,
                },
                None => FighterState::Done,
            },
            SpawnAttempt::Retry => FighterState::Unspawned {
                source,
                failed_attempts: failed_attempts + 1,
            },
            SpawnAttempt::Failed => FighterState::Done,
        };
    }

    fn patrol(
        &mut self,
        world: &mut World,
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
        waypoint: Option<TileRef>,
    ) -> FighterState {
        let cfg = world.config().fighter;
        let waypoint = waypoint.or_else(|| {
            random_tile_near(
                world.map(),
                &mut self.rng,
                home,
                cfg.patrol_range,
                cfg.patrol_attempts,
                |_| true,
            )
        });
        let Some(tile) = waypoint else {
            tracing::warn!(unit, "no patrol tile found, retrying next tick");
            return FighterState::Patrolling {
                unit,
                owner,
                home,
                waypoint: None,
            };
        };

        let reached = fly_toward(world, &mut self.rng, unit, tile, cfg.speed);
        FighterState::Patrolling {
            unit,
            owner,
            home,
            waypoint: (!reached).then_some(tile),
        }
    }

    fn engage(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        cfg: FighterConfig,
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
        target: UnitId,
        orbit: Option<TileRef>,
    ) -> FighterState {
        let world = &mut *ctx.world;
        let (Some(here), Some(target_tile)) = (
            world.unit(unit).map(|u| u.tile),
            world.unit(target).map(|t| t.tile),
        ) else {
            return FighterState::Done;
        };

        let band = cfg.dogfight_inner + cfg.dogfight_outer;
        let band_sq = u64::from(band).pow(2);
        let min_sq = u64::from(cfg.min_safe_distance).pow(2);
        let in_band = world.map().euclidean_dist_squared(here, target_tile) <= band_sq;

        let orbit = if in_band {
            let inner = cfg.dogfight_inner.max(cfg.min_safe_distance);
            let outer = band.min(cfg.attack_range).max(inner);
            let map = world.map();
            let side = offset(map, target_tile, here);
            let orbit = orbit.or_else(|| {
                // only points on the fighter's side of the target
                random_tile_in_band(
                    map,
                    &mut self.rng,
                    target_tile,
                    inner,
                    outer,
                    cfg.patrol_attempts,
                    |tile| {
                        let (px, py) = offset(map, target_tile, tile);
                        px * side.0 + py * side.1 >= 0
                    },
                )
            });
            match orbit {
                Some(point) => {
                    let (now, moved) = fly_clear_of(
                        world,
                        &mut self.rng,
                        unit,
                        point,
                        target_tile,
                        min_sq,
                        cfg.speed,
                    );
                    (moved && world.map().manhattan_dist(now, point) > cfg.reached_distance)
                        .then_some(point)
                }
                None => {
                    tracing::warn!(unit, target, "no orbit point found, holding position");
                    None
                }
            }
        } else {
            fly_clear_of(
                world,
                &mut self.rng,
                unit,
                target_tile,
                target_tile,
                min_sq,
                cfg.speed,
            );
            None
        };

        let here = world.unit(unit).map_or(here, |u| u.tile);
        let in_range = world.map().euclidean_dist_squared(here, target_tile)
            <= u64::from(cfg.attack_range).pow(2);
        if in_range && self.ticks_since_fire >= cfg.fire_cadence {
            ctx.spawn(ShellExecution::new(owner, here, target, cfg.shell_damage));
            self.ticks_since_fire = 0;
        }

        FighterState::Attacking {
            unit,
            owner,
            home,
            target,
            orbit,
        }
    }

    fn tick_active(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
        engaged: Option<(UnitId, Option<TileRef>)>,
        waypoint: Option<TileRef>,
    ) -> FighterState {
        let world = &mut *ctx.world;
        let Some(fighter) = world.unit(unit) else {
            return FighterState::Done;
        };
        let (current_owner, here) = (fighter.owner, fighter.tile);

        let (owner, home) = if current_owner == owner {
            (owner, home)
        } else {
            match world.nearest_player_unit(current_owner, UnitKind::Airfield, here) {
                Some(airfield) => (current_owner, airfield.tile),
                None => {
                    tracing::debug!(unit, owner = %current_owner, "captured fighter has no airfield");
                    world.delete_unit(unit);
                    return FighterState::Done;
                }
            }
        };

        let cfg = world.config().fighter;
        self.ticks_since_fire = self.ticks_since_fire.saturating_add(1);

        let range_sq = u64::from(cfg.targeting_range).pow(2);
        let still_engaged = engaged.filter(|&(target, _)| {
            world.unit(target).is_some_and(|t| {
                !world.is_friendly(owner, t.owner)
                    && world.map().euclidean_dist_squared(here, t.tile) <= range_sq
            })
        });
        let engaged = still_engaged.or_else(|| {
            let claimed = world.claimed_targets(owner, UnitKind::Fighter, Some(unit));
            select_target(
                world,
                &TargetQuery {
                    seeker: Some(unit),
                    owner,
                    origin: here,
                    range: cfg.targeting_range,
                    priorities: FIGHTER_PRIORITIES,
                    claimed: &claimed,
                },
            )
            .map(|target| (target, None))
        });
        world.set_target(unit, engaged.map(|(target, _)| target));

        match engaged {
            Some((target, orbit)) => self.engage(ctx, cfg, unit, owner, home, target, orbit),
            None => self.patrol(ctx.world, unit, owner, home, waypoint),
        }
    }
}

/// `tile - origin` in lattice units.
fn offset(map: &dyn GameMap, origin: TileRef, tile: TileRef) -> (i64, i64) {
    (
        i64::from(map.x(tile)) - i64::from(map.x(origin)),
        i64::from(map.y(tile)) - i64::from(map.y(origin)),
    )
}

/// Axis steps circling `avoid` in the rotation that heads for
/// `destination`, larger component first.
fn sidesteps(
    map: &dyn GameMap,
    current: TileRef,
    destination: TileRef,
    avoid: TileRef,
) -> Vec<TileRef> {
    let (rx, ry) = offset(map, avoid, current);
    let (ex, ey) = offset(map, current, destination);
    let (mut tx, mut ty) = (-ry, rx);
    if tx * ex + ty * ey < 0 {
        (tx, ty) = (-tx, -ty);
    }

    let (cx, cy) = (i64::from(map.x(current)), i64::from(map.y(current)));
    let along_x = (tx != 0).then(|| (cx + tx.signum(), cy));
    let along_y = (ty != 0).then(|| (cx, cy + ty.signum()));
    let ordered = if tx.abs() >= ty.abs() {
        [along_x, along_y]
    } else {
        [along_y, along_x]
    };
    ordered
        .into_iter()
        .flatten()
        .filter_map(|(x, y)| map.try_tile_ref(x, y))
        .collect()
}

/// Fly up to `steps` tiles toward `destination` without ending a step
/// within `min_sq` (squared) of `avoid`, unless that step moves away
/// from it.
///
/// A blocked direct step is replaced by a sidestep around `avoid`; when
/// neither is clear the fighter stops for the tick. Returns the tile
/// reached and whether the fighter moved.
fn fly_clear_of(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    unit: UnitId,
    destination: TileRef,
    avoid: TileRef,
    min_sq: u64,
    steps: u32,
) -> (TileRef, bool) {
    let Some(start) = world.unit(unit).map(|u| u.tile) else {
        return (destination, false);
    };
    let map = world.map();
    let mut current = start;
    for _ in 0..steps.max(1) {
        if current == destination {
            break;
        }
        let toward = match AirMover.next_tile(map, rng, current, destination) {
            MoverStep::Next(tile) => tile,
            MoverStep::Arrived => destination,
        };
        let here_sq = map.euclidean_dist_squared(current, avoid);
        let clear = |tile: TileRef| {
            let d = map.euclidean_dist_squared(tile, avoid);
            d >= min_sq || d > here_sq
        };
        let next = std::iter::once(toward)
            .chain(sidesteps(map, current, destination, avoid))
            .find(|&tile| clear(tile));
        match next {
            Some(tile) => current = tile,
            None => break,
        }
    }
    world.move_unit(unit, current);
    (current, current != start)
}

impl Execution for FighterExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.rng = ChaCha8Rng::seed_from_u64(ctx.world.next_seed());
        self.ticks_since_fire = ctx.world.config().fighter.fire_cadence;
        if let FighterState::Unspawned {
            source,
            failed_attempts,
        } = self.state
        {
            self.try_spawn(ctx.world, source, failed_attempts);
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.state = match self.state {
            FighterState::Unspawned {
                source,
                failed_attempts,
            } => {
                self.try_spawn(ctx.world, source, failed_attempts);
                return;
            }
            FighterState::Patrolling {
                unit,
                owner,
                home,
                waypoint,
            } => self.tick_active(ctx, unit, owner, home, None, waypoint),
            FighterState::Attacking {
                unit,
                owner,
                home,
                target,
                orbit,
            } => self.tick_active(ctx, unit, owner, home, Some((target, orbit)), None),
            FighterState::Done => FighterState::Done,
        };
    }

    fn is_active(&self) -> bool {
        self.state != FighterState::Done
    }

    fn name(&self) -> &'static str {
        "fighter"
    }
}
