//! Troop transports.
//!
//! A transport embarks troops from its owner's pool at a port, sails a
//! coarse water route to a shore tile and lands them. Landing next to a
//! hostile city attacks it; the city changes hands if the landing force
//! outnumbers its garrison.

use super::{attempt_spawn, sail, SpawnAttempt};
use crate::execution::{Execution, ExecutionContext, UnitSource};
use crate::map::TileRef;
use crate::pathfinding::{PathFinder, PathStep, SearchStrategy, Traversal};
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};
use crate::world::{GameEvent, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportState {
    Unspawned {
        source: UnitSource,
        failed_attempts: u32,
    },
    Sailing {
        unit: UnitId,
        owner: PlayerId,
        troops: u32,
    },
    Returning {
        unit: UnitId,
        owner: PlayerId,
        port: TileRef,
        troops: u32,
    },
    Done,
}

/// Carries troops from a port to a shore tile.
#[derive(Debug)]
pub struct TransportShipExecution {
    destination: TileRef,
    troops: u32,
    state: TransportState,
    pathfinder: Option<PathFinder>,
}

impl TransportShipExecution {
    /// Ship up to `troops` troops to `destination`, which must be a shore
    /// tile.
    #[must_use]
    pub fn new(source: UnitSource, destination: TileRef, troops: u32) -> Self {
        Self {
            destination,
            troops,
            state: TransportState::Unspawned {
                source,
                failed_attempts: 0,
            },
            pathfinder: None,
        }
    }

    fn try_spawn(&mut self, world: &mut World, source: UnitSource, failed_attempts: u32) {
        self.state = match attempt_spawn(world, UnitKind::TransportShip, source, failed_attempts) {
            SpawnAttempt::Spawned(unit) => {
                let Some(owner) = world.unit(unit).map(|u| u.owner) else {
                    self.state = TransportState::Done;
                    return;
                };
                let troops = world.take_troops(owner, self.troops);
                if troops == 0 {
                    world.advise(owner, "no troops to embark");
                    world.delete_unit(unit);
                    TransportState::Done
                } else {
                    world.set_troops(unit, troops);
                    tracing::info!(unit, owner = %owner, troops, "transport embarked");
                    TransportState::Sailing {
                        unit,
                        owner,
                        troops,
                    }
                }
            }
            SpawnAttempt::Retry => TransportState::Unspawned {
                source,
                failed_attempts: failed_attempts + 1,
            },
            SpawnAttempt::Failed => TransportState::Done,
        };
    }
}

/// After a capture: the new owner's nearest port, or `None` if they have
/// none and the transport was removed.
fn rehome(world: &mut World, unit: UnitId) -> Option<(PlayerId, TileRef)> {
    let ship = world.unit(unit)?;
    let (owner, tile) = (ship.owner, ship.tile);
    match world.nearest_player_unit(owner, UnitKind::Port, tile) {
        Some(port) => Some((owner, port.tile)),
        None => {
            tracing::debug!(unit, owner = %owner, "captured transport has no port");
            world.delete_unit(unit);
            None
        }
    }
}

fn land(world: &mut World, unit: UnitId, owner: PlayerId, troops: u32, tile: TileRef) {
    tracing::info!(unit, owner = %owner, troops, tile = %tile, "troops landed");
    world.emit(GameEvent::TroopsLanded {
        owner,
        tile,
        troops,
    });

    let city = world
        .units_in_range(tile, 1)
        .into_iter()
        .find(|u| u.kind == UnitKind::City)
        .map(|u| (u.id, u.owner, u.troops));
    match city {
        Some((city, holder, garrison)) if world.is_friendly(owner, holder) => {
            world.set_troops(city, garrison.saturating_add(troops));
        }
        Some((city, _, garrison)) if troops > garrison => {
            world.capture_unit(city, owner);
            world.set_troops(city, troops - garrison);
        }
        Some((city, _, garrison)) => world.set_troops(city, garrison - troops),
        None => world.add_troops(owner, troops),
    }
    world.delete_unit(unit);
}

impl Execution for TransportShipExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let world = &mut *ctx.world;
        let pathing = world.config().pathfinding;
        self.pathfinder = Some(PathFinder::new(
            SearchStrategy::Coarse(Traversal::Water),
            pathing.limits,
            pathing.recompute,
        ));

        let TransportState::Unspawned {
            source,
            failed_attempts,
        } = self.state
        else {
            return;
        };
        if !world.map().is_shore(self.destination) {
            let owner = match source {
                UnitSource::Spawn(request) => Some(request.owner),
                UnitSource::Existing(id) => world.unit(id).map(|u| u.owner),
            };
            if let Some(owner) = owner {
                world.advise(owner, format!("{} is not a landing site", self.destination));
            }
            self.state = TransportState::Done;
            return;
        }
        self.try_spawn(world, source, failed_attempts);
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        let Some(pathfinder) = self.pathfinder.as_mut() else {
            panic!("TransportShipExecution ticked before init");
        };
        let world = &mut *ctx.world;
        let speed = world.config().transport.speed;

        self.state = match self.state {
            TransportState::Unspawned {
                source,
                failed_attempts,
            } => {
                self.try_spawn(world, source, failed_attempts);
                return;
            }
            TransportState::Sailing {
                unit,
                owner,
                troops,
            } => {
                let Some(current_owner) = world.unit(unit).map(|u| u.owner) else {
                    tracing::debug!(unit, troops, "transport lost at sea");
                    self.state = TransportState::Done;
                    return;
                };
                if current_owner != owner {
                    pathfinder.reset();
                    self.state = match rehome(world, unit) {
                        Some((owner, port)) => TransportState::Returning {
                            unit,
                            owner,
                            port,
                            troops,
                        },
                        None => TransportState::Done,
                    };
                    return;
                }

                match sail(world, pathfinder, unit, self.destination, speed, 1) {
                    PathStep::Completed(_) => {
                        land(world, unit, owner, troops, self.destination);
                        TransportState::Done
                    }
                    PathStep::PathNotFound => {
                        tracing::debug!(unit, destination = %self.destination, "no route for transport");
                        world.add_troops(owner, troops);
                        world.emit(GameEvent::TransportFailed { owner, troops });
                        world.delete_unit(unit);
                        TransportState::Done
                    }
                    PathStep::Next(_) | PathStep::Pending => TransportState::Sailing {
                        unit,
                        owner,
                        troops,
                    },
                }
            }
            TransportState::Returning {
                unit,
                owner,
                port,
                troops,
            } => {
                if !world.is_alive(unit) {
                    self.state = TransportState::Done;
                    return;
                }
                match sail(world, pathfinder, unit, port, speed, 1) {
                    PathStep::Completed(_) | PathStep::PathNotFound => {
                        world.add_troops(owner, troops);
                        world.delete_unit(unit);
                        TransportState::Done
                    }
                    PathStep::Next(_) | PathStep::Pending => TransportState::Returning {
                        unit,
                        owner,
                        port,
                        troops,
                    },
                }
            }
            TransportState::Done => TransportState::Done,
        };
    }

    fn is_active(&self) -> bool {
        self.state != TransportState::Done
    }

    fn name(&self) -> &'static str {
        "transport"
    }
}
