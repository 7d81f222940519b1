//! Bomber sorties.
//!
//! A bomber launches from its owner's nearest airfield, flies straight to
//! its target and releases one bomb every `drop_cadence` ticks while over
//! it. When the payload is spent, or nothing worth bombing is left in
//! range, it flies home and is removed on landing.

use std::collections::BTreeSet;

use super::{attempt_spawn, fixed_speed, BombExecution, SpawnAttempt};
use crate::execution::{Execution, ExecutionContext, UnitSource};
use crate::map::TileRef;
use crate::movers::{MoverStep, StraightLineMover};
use crate::players::PlayerId;
use crate::targeting::{select_target, TargetQuery, BOMBER_PRIORITIES};
use crate::units::{UnitId, UnitKind};
use crate::world::{GameEvent, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BomberState {
    Unspawned {
        source: UnitSource,
        failed_attempts: u32,
    },
    Attacking {
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
        target: UnitId,
        payload: u32,
        ticks_since_drop: u32,
    },
    Returning {
        unit: UnitId,
        owner: PlayerId,
        home: TileRef,
    },
    Done,
}

/// Drives one bomber from launch to landing.
#[derive(Debug)]
pub struct BomberExecution {
    state: BomberState,
    initial_target: Option<UnitId>,
}

impl BomberExecution {
    /// Bomb `target`, or whatever is most valuable near the airfield if
    /// `None`.
    #[must_use]
    pub fn new(source: UnitSource, target: Option<UnitId>) -> Self {
        Self {
            state: BomberState::Unspawned {
                source,
                failed_attempts: 0,
            },
            initial_target: target,
        }
    }

    /// Bombs left, while attacking.
    #[must_use]
    pub fn payload(&self) -> Option<u32> {
        match self.state {
            BomberState::Attacking { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Whether the bomber has turned for home.
    #[must_use]
    pub fn is_returning(&self) -> bool {
        matches!(self.state, BomberState::Returning { .. })
    }

    fn try_spawn(&mut self, world: &mut World, source: UnitSource, failed_attempts: u32) {
        self.state = match attempt_spawn(world, UnitKind::Bomber, source, failed_attempts) {
            SpawnAttempt::Spawned(unit) => {
                let Some(bomber) = world.unit(unit) else {
                    self.state = BomberState::Done;
                    return;
                };
                let (owner, home) = (bomber.owner, bomber.tile);
                let cfg = world.config().bomber;
                let target = self
                    .initial_target
                    .filter(|&t| is_hostile(world, owner, t))
                    .or_else(|| find_target(world, unit, owner, home, cfg.targeting_range));
                match target {
                    Some(target) => {
                        world.set_target(unit, Some(target));
                        BomberState::Attacking {
                            unit,
                            owner,
                            home,
                            target,
                            payload: cfg.payload,
                            ticks_since_drop: cfg.drop_cadence,
                        }
                    }
                    None => turn_home(world, unit, owner, home),
                }
            }
            SpawnAttempt::Retry => BomberState::Unspawned {
                source,
                failed_attempts: failed_attempts + 1,
            },
            SpawnAttempt::Failed => BomberState::Done,
        };
    }
}

fn is_hostile(world: &World, owner: PlayerId, target: UnitId) -> bool {
    world
        .unit(target)
        .is_some_and(|t| !world.is_friendly(owner, t.owner))
}

fn find_target(
    world: &World,
    unit: UnitId,
    owner: PlayerId,
    origin: TileRef,
    range: u32,
) -> Option<UnitId> {
    let claimed = BTreeSet::new();
    select_target(
        world,
        &TargetQuery {
            seeker: Some(unit),
            owner,
            origin,
            range,
            priorities: BOMBER_PRIORITIES,
            claimed: &claimed,
        },
    )
}

fn turn_home(world: &mut World, unit: UnitId, owner: PlayerId, home: TileRef) -> BomberState {
    world.set_target(unit, None);
    world.emit(GameEvent::ReturningToBase { unit });
    tracing::debug!(unit, "bomber returning to base");
    BomberState::Returning { unit, owner, home }
}

/// After a capture: the new owner's nearest airfield, or `None` if they
/// have none and the bomber was removed.
fn rehome(world: &mut World, unit: UnitId) -> Option<(PlayerId, TileRef)> {
    let bomber = world.unit(unit)?;
    let (owner, tile) = (bomber.owner, bomber.tile);
    match world.nearest_player_unit(owner, UnitKind::Airfield, tile) {
        Some(airfield) => Some((owner, airfield.tile)),
        None => {
            tracing::debug!(unit, owner = %owner, "captured bomber has no airfield");
            world.delete_unit(unit);
            None
        }
    }
}

/// Fly `unit` toward `destination`; true once over it.
fn fly(world: &mut World, unit: UnitId, destination: TileRef) -> bool {
    let Some(current) = world.unit(unit).map(|u| u.tile) else {
        return false;
    };
    let speed = fixed_speed(world.config().bomber.speed);
    let next = match StraightLineMover.next_tile(world.map(), current, destination, speed) {
        MoverStep::Next(tile) => tile,
        MoverStep::Arrived => destination,
    };
    world.move_unit(unit, next);
    next == destination
}

impl Execution for BomberExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        if let BomberState::Unspawned {
            source,
            failed_attempts,
        } = self.state
        {
            self.try_spawn(ctx.world, source, failed_attempts);
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.state = match self.state {
            BomberState::Unspawned {
                source,
                failed_attempts,
            } => {
                self.try_spawn(ctx.world, source, failed_attempts);
                return;
            }
            BomberState::Attacking {
                unit,
                owner,
                home,
                target,
                payload,
                ticks_since_drop,
            } => {
                let world = &mut *ctx.world;
                let Some(current_owner) = world.unit(unit).map(|u| u.owner) else {
                    self.state = BomberState::Done;
                    return;
                };
                if current_owner != owner {
                    self.state = match rehome(world, unit) {
                        Some((owner, home)) => turn_home(world, unit, owner, home),
                        None => BomberState::Done,
                    };
                    return;
                }

                let range = world.config().bomber.targeting_range;
                let target = if is_hostile(world, owner, target) {
                    Some(target)
                } else {
                    let here = world.unit(unit).map_or(home, |u| u.tile);
                    find_target(world, unit, owner, here, range)
                };
                let Some(target) = target else {
                    self.state = turn_home(world, unit, owner, home);
                    return;
                };
                world.set_target(unit, Some(target));
                let target_tile = world.unit(target).map_or(home, |t| t.tile);

                let mut payload = payload;
                let mut ticks_since_drop = ticks_since_drop;
                if fly(world, unit, target_tile) {
                    if ticks_since_drop >= world.config().bomber.drop_cadence {
                        ctx.spawn(BombExecution::new(owner, target_tile, target_tile));
                        ctx.world.emit(GameEvent::PayloadDropped {
                            bomber: unit,
                            target,
                            tile: target_tile,
                        });
                        payload = payload.saturating_sub(1);
                        ticks_since_drop = 0;
                    }
                    ticks_since_drop = ticks_since_drop.saturating_add(1);
                }

                if payload == 0 {
                    turn_home(ctx.world, unit, owner, home)
                } else {
                    BomberState::Attacking {
                        unit,
                        owner,
                        home,
                        target,
                        payload,
                        ticks_since_drop,
                    }
                }
            }
            BomberState::Returning { unit, owner, home } => {
                let world = &mut *ctx.world;
                let Some(current_owner) = world.unit(unit).map(|u| u.owner) else {
                    self.state = BomberState::Done;
                    return;
                };
                let (owner, home) = if current_owner == owner {
                    (owner, home)
                } else {
                    match rehome(world, unit) {
                        Some(rehomed) => rehomed,
                        None => {
                            self.state = BomberState::Done;
                            return;
                        }
                    }
                };

                if fly(world, unit, home) {
                    tracing::debug!(unit, "bomber landed");
                    world.delete_unit(unit);
                    BomberState::Done
                } else {
                    BomberState::Returning { unit, owner, home }
                }
            }
            BomberState::Done => BomberState::Done,
        };
    }

    fn is_active(&self) -> bool {
        self.state != BomberState::Done
    }

    fn name(&self) -> &'static str {
        "bomber"
    }
}
