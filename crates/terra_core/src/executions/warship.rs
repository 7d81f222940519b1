//! Warship patrols.
//!
//! Warships navigate with a full-resolution water path finder. They patrol
//! random water tiles around a patrol centre (the port they were launched
//! from) and break off to chase transports and enemy warships, shelling
//! them whenever the guns are ready.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{attempt_spawn, random_tile_near, sail, ShellExecution, SpawnAttempt};
use crate::execution::{Execution, ExecutionContext, UnitSource};
use crate::map::TileRef;
use crate::pathfinding::{PathFinder, PathStep, SearchStrategy, Traversal};
use crate::players::PlayerId;
use crate::targeting::{select_target, TargetQuery, WARSHIP_PRIORITIES};
use crate::units::{UnitId, UnitKind};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WarshipState {
    Unspawned {
        source: UnitSource,
        failed_attempts: u32,
    },
    Patrolling {
        unit: UnitId,
        owner: PlayerId,
        centre: TileRef,
        waypoint: Option<TileRef>,
    },
    Attacking {
        unit: UnitId,
        owner: PlayerId,
        centre: TileRef,
        target: UnitId,
    },
    Done,
}

/// Drives one warship for as long as it lives.
#[derive(Debug)]
pub struct WarshipExecution {
    state: WarshipState,
    pathfinder: Option<PathFinder>,
    rng: ChaCha8Rng,
    ticks_since_fire: u32,
}

impl WarshipExecution {
    /// Control the warship described by `source`.
    #[must_use]
    pub fn new(source: UnitSource) -> Self {
        Self {
            state: WarshipState::Unspawned {
                source,
                failed_attempts: 0,
            },
            pathfinder: None,
            rng: ChaCha8Rng::seed_from_u64(0),
            ticks_since_fire: 0,
        }
    }

    /// The unit currently engaged, if any.
    #[must_use]
    pub fn target(&self) -> Option<UnitId> {
        match self.state {
            WarshipState::Attacking { target, .. } => Some(target),
            _ => None,
        }
    }

    fn try_spawn(&mut self, world: &mut World, source: UnitSource, failed_attempts: u32) {
        self.state = match attempt_spawn(world, UnitKind::Warship, source, failed_attempts) {
            SpawnAttempt::Spawned(unit) => match world.unit(unit) {
                Some(ship) => WarshipState::Patrolling {
                    unit,
                    owner: ship.owner,
                    centre: ship.tile,
                    waypoint: None,
                },
                None => WarshipState::Done,
            },
            SpawnAttempt::Retry => WarshipState::Unspawned {
                source,
                failed_attempts: failed_attempts + 1,
            },
            SpawnAttempt::Failed => WarshipState::Done,
        };
    }

    fn tick_active(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        unit: UnitId,
        owner: PlayerId,
        centre: TileRef,
        target: Option<UnitId>,
        waypoint: Option<TileRef>,
    ) -> WarshipState {
        let Some(pathfinder) = self.pathfinder.as_mut() else {
            panic!("WarshipExecution ticked before init");
        };
        let world = &mut *ctx.world;
        let Some(ship) = world.unit(unit) else {
            return WarshipState::Done;
        };
        let (current_owner, here) = (ship.owner, ship.tile);

        let (owner, centre, waypoint) = if current_owner == owner {
            (owner, centre, waypoint)
        } else {
            match world.nearest_player_unit(current_owner, UnitKind::Port, here) {
                Some(port) => {
                    pathfinder.reset();
                    (current_owner, port.tile, None)
                }
                None => {
                    tracing::debug!(unit, owner = %current_owner, "captured warship has no port");
                    world.delete_unit(unit);
                    return WarshipState::Done;
                }
            }
        };

        let cfg = world.config().warship;
        self.ticks_since_fire = self.ticks_since_fire.saturating_add(1);

        let range_sq = u64::from(cfg.targeting_range).pow(2);
        let kept = target.filter(|&t| {
            world.unit(t).is_some_and(|t| {
                !world.is_friendly(owner, t.owner)
                    && world.map().euclidean_dist_squared(here, t.tile) <= range_sq
            })
        });
        let target = kept.or_else(|| {
            let claimed = world.claimed_targets(owner, UnitKind::Warship, Some(unit));
            select_target(
                world,
                &TargetQuery {
                    seeker: Some(unit),
                    owner,
                    origin: here,
                    range: cfg.targeting_range,
                    priorities: WARSHIP_PRIORITIES,
                    claimed: &claimed,
                },
            )
        });
        world.set_target(unit, target);

        if let Some(target) = target {
            let target_tile = world.unit(target).map_or(here, |t| t.tile);
            sail(world, pathfinder, unit, target_tile, cfg.speed, cfg.attack_range);

            let now = world.unit(unit).map_or(here, |u| u.tile);
            let in_range = world.map().euclidean_dist_squared(now, target_tile)
                <= u64::from(cfg.attack_range).pow(2);
            if in_range && self.ticks_since_fire >= cfg.fire_cadence {
                ctx.spawn(ShellExecution::new(owner, now, target, cfg.shell_damage));
                self.ticks_since_fire = 0;
            }
            return WarshipState::Attacking {
                unit,
                owner,
                centre,
                target,
            };
        }

        let waypoint = waypoint.or_else(|| {
            let map = world.map();
            random_tile_near(
                map,
                &mut self.rng,
                centre,
                cfg.patrol_range,
                cfg.patrol_attempts,
                |tile| map.is_water(tile),
            )
        });
        let Some(tile) = waypoint else {
            tracing::warn!(unit, centre = %centre, "no water patrol tile found, retrying next tick");
            return WarshipState::Patrolling {
                unit,
                owner,
                centre,
                waypoint: None,
            };
        };

        let waypoint = match sail(world, pathfinder, unit, tile, cfg.speed, 1) {
            PathStep::Next(_) | PathStep::Pending => Some(tile),
            PathStep::Completed(_) | PathStep::PathNotFound => None,
        };
        WarshipState::Patrolling {
            unit,
            owner,
            centre,
            waypoint,
        }
    }
}

impl Execution for WarshipExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let world = &mut *ctx.world;
        let pathing = world.config().pathfinding;
        self.pathfinder = Some(PathFinder::new(
            SearchStrategy::Terrain(Traversal::Water),
            pathing.limits,
            pathing.recompute,
        ));
        self.rng = ChaCha8Rng::seed_from_u64(world.next_seed());
        self.ticks_since_fire = world.config().warship.fire_cadence;
        if let WarshipState::Unspawned {
            source,
            failed_attempts,
        } = self.state
        {
            self.try_spawn(world, source, failed_attempts);
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.state = match self.state {
            WarshipState::Unspawned {
                source,
                failed_attempts,
            } => {
                self.try_spawn(ctx.world, source, failed_attempts);
                return;
            }
            WarshipState::Patrolling {
                unit,
                owner,
                centre,
                waypoint,
            } => self.tick_active(ctx, unit, owner, centre, None, waypoint),
            WarshipState::Attacking {
                unit,
                owner,
                centre,
                target,
            } => self.tick_active(ctx, unit, owner, centre, Some(target), None),
            WarshipState::Done => WarshipState::Done,
        };
    }

    fn is_active(&self) -> bool {
        self.state != WarshipState::Done
    }

    fn name(&self) -> &'static str {
        "warship"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::{GameMap, GridMap};
    use crate::players::Player;
    use crate::scheduler::ExecutionScheduler;
    use crate::world::GameEvent;

    const RED: PlayerId = PlayerId(1);
    const BLUE: PlayerId = PlayerId(2);

    /// Open sea with a land strip along the west edge.
    fn setup() -> (World, ExecutionScheduler, TileRef) {
        let rows: Vec<String> = (0..40)
            .map(|_| format!("##{}", "~".repeat(58)))
            .collect();
        let map = GridMap::from_ascii(&rows).unwrap();
        let mut world = World::new(Box::new(map), GameConfig::default());
        let mut red = Player::new(RED, "red");
        red.gold = 10_000;
        world.add_player(red);
        world.add_player(Player::new(BLUE, "blue"));
        let port = world.map().tile_ref(1, 20);
        world.place_unit(RED, UnitKind::Port, port);
        (world, ExecutionScheduler::new(), port)
    }

    fn run(scheduler: &mut ExecutionScheduler, world: &mut World, ticks: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            scheduler.run_tick(world);
            world.advance_tick();
            events.extend(world.drain_events());
        }
        events
    }

    fn warship(world: &World, owner: PlayerId) -> UnitId {
        world.player_units(owner, UnitKind::Warship)[0].id
    }

    #[test]
    fn test_patrols_on_water_near_port() {
        let (mut world, mut scheduler, port) = setup();
        scheduler.add_execution(Box::new(WarshipExecution::new(UnitSource::spawn(RED, port))));
        run(&mut scheduler, &mut world, 1);
        let ship = warship(&world, RED);

        let range = world.config().warship.patrol_range;
        let mut moved = false;
        for _ in 0..100 {
            run(&mut scheduler, &mut world, 1);
            let tile = world.unit(ship).unwrap().tile;
            moved |= tile != port;
            if tile != port {
                assert!(world.map().is_water(tile));
            }
            let map = world.map();
            assert!(map.manhattan_dist(port, tile) <= 2 * range + 1);
        }
        assert!(moved);
    }

    #[test]
    fn test_prefers_transport_and_shells_it() {
        let (mut world, mut scheduler, port) = setup();
        scheduler.add_execution(Box::new(WarshipExecution::new(UnitSource::spawn(RED, port))));
        run(&mut scheduler, &mut world, 1);
        world.place_unit(BLUE, UnitKind::Warship, world.map().tile_ref(12, 20));
        let transport = world.place_unit(BLUE, UnitKind::TransportShip, world.map().tile_ref(18, 22));
        let events = run(&mut scheduler, &mut world, 40);

        assert!(!world.is_alive(transport));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::UnitDestroyed { unit, .. } if *unit == transport
        )));
    }

    #[test]
    fn test_captured_without_port_is_removed() {
        let (mut world, mut scheduler, port) = setup();
        scheduler.add_execution(Box::new(WarshipExecution::new(UnitSource::spawn(RED, port))));
        run(&mut scheduler, &mut world, 2);
        let ship = warship(&world, RED);
        world.capture_unit(ship, BLUE);
        run(&mut scheduler, &mut world, 1);
        assert!(!world.is_alive(ship));
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn test_captured_with_port_patrols_new_centre() {
        let (mut world, mut scheduler, port) = setup();
        let blue_port = world.map().tile_ref(1, 2);
        world.place_unit(BLUE, UnitKind::Port, blue_port);
        scheduler.add_execution(Box::new(WarshipExecution::new(UnitSource::spawn(RED, port))));
        run(&mut scheduler, &mut world, 2);
        let ship = warship(&world, RED);
        world.capture_unit(ship, BLUE);
        run(&mut scheduler, &mut world, 120);

        assert!(world.is_alive(ship));
        let tile = world.unit(ship).unwrap().tile;
        let range = world.config().warship.patrol_range;
        assert!(world.map().manhattan_dist(blue_port, tile) <= 2 * range + 1);
        assert_eq!(scheduler.live_count(), 1);
    }

    #[test]
    #[should_panic(expected = "ticked before init")]
    fn test_tick_before_init_panics() {
        let (mut world, _, port) = setup();
        let ship = world.place_unit(RED, UnitKind::Warship, port);
        let mut execution = WarshipExecution::new(UnitSource::Existing(ship));
        execution.state = WarshipState::Patrolling {
            unit: ship,
            owner: RED,
            centre: port,
            waypoint: None,
        };
        let mut spawned = Vec::new();
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        execution.tick(&mut ctx);
    }
}
