//! Ballistic missiles.

use super::{attempt_spawn, detonate, fixed_speed, SpawnAttempt};
use crate::execution::{Execution, ExecutionContext, UnitSource};
use crate::map::TileRef;
use crate::movers::{MoverStep, ParabolaMover};
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissileState {
    Unspawned {
        source: UnitSource,
        failed_attempts: u32,
    },
    Flying {
        unit: UnitId,
        owner: PlayerId,
    },
    Done,
}

/// A missile launched from a silo on a high arc.
///
/// The blast does not distinguish friend from foe. An interceptor that
/// destroys the missile in flight ends the execution without a blast.
#[derive(Debug)]
pub struct MissileExecution {
    target: TileRef,
    mover: ParabolaMover,
    state: MissileState,
}

impl MissileExecution {
    /// Launch at `target` from the silo nearest the request.
    #[must_use]
    pub fn new(source: UnitSource, target: TileRef) -> Self {
        Self {
            target,
            mover: ParabolaMover::new(),
            state: MissileState::Unspawned {
                source,
                failed_attempts: 0,
            },
        }
    }

    fn try_spawn(&mut self, world: &mut World, source: UnitSource, failed_attempts: u32) {
        self.state = match attempt_spawn(world, UnitKind::Missile, source, failed_attempts) {
            SpawnAttempt::Spawned(unit) => match world.unit(unit) {
                Some(missile) => {
                    let (owner, origin) = (missile.owner, missile.tile);
                    let speed = fixed_speed(world.config().missile.speed);
                    self.mover
                        .compute_control_points(world.map(), origin, self.target, speed, true);
                    tracing::info!(unit, owner = %owner, target = %self.target, "missile launched");
                    MissileState::Flying { unit, owner }
                }
                None => MissileState::Done,
            },
            SpawnAttempt::Retry => MissileState::Unspawned {
                source,
                failed_attempts: failed_attempts + 1,
            },
            SpawnAttempt::Failed => MissileState::Done,
        };
    }
}

impl Execution for MissileExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        if let MissileState::Unspawned {
            source,
            failed_attempts,
        } = self.state
        {
            self.try_spawn(ctx.world, source, failed_attempts);
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        match self.state {
            MissileState::Unspawned {
                source,
                failed_attempts,
            } => self.try_spawn(ctx.world, source, failed_attempts),
            MissileState::Flying { unit, owner } => {
                let world = &mut *ctx.world;
                if !world.is_alive(unit) {
                    tracing::debug!(unit, "missile lost in flight");
                    self.state = MissileState::Done;
                    return;
                }
                let blast = world.config().missile;
                match self.mover.next_tile(world.map(), fixed_speed(blast.speed)) {
                    MoverStep::Next(tile) => world.move_unit(unit, tile),
                    MoverStep::Arrived => {
                        world.move_unit(unit, self.target);
                        detonate(world, UnitKind::Missile, owner, unit, self.target, blast, false);
                        world.delete_unit(unit);
                        self.state = MissileState::Done;
                    }
                }
            }
            MissileState::Done => {}
        }
    }

    fn is_active(&self) -> bool {
        self.state != MissileState::Done
    }

    fn name(&self) -> &'static str {
        "missile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::{GameMap, GridMap, TerrainType};
    use crate::players::Player;
    use crate::scheduler::ExecutionScheduler;

    fn world() -> World {
        let map = GridMap::filled(80, 80, TerrainType::Plains).unwrap();
        let mut world = World::new(Box::new(map), GameConfig::default());
        let mut red = Player::new(PlayerId(1), "red");
        red.gold = 1_000;
        world.add_player(red);
        world.add_player(Player::new(PlayerId(2), "blue"));
        world
    }

    fn run(scheduler: &mut ExecutionScheduler, world: &mut World, ticks: u64) {
        for _ in 0..ticks {
            scheduler.run_tick(world);
            world.advance_tick();
        }
    }

    #[test]
    fn test_missile_blast_hits_everyone_in_radius() {
        let mut world = world();
        let silo = world.map().tile_ref(5, 70);
        world.place_unit(PlayerId(1), UnitKind::MissileSilo, silo);
        let aim = world.map().tile_ref(60, 60);
        let own = world.place_unit(PlayerId(1), UnitKind::City, world.map().tile_ref(61, 60));
        let foe = world.place_unit(PlayerId(2), UnitKind::City, aim);

        let mut scheduler = ExecutionScheduler::new();
        scheduler.add_execution(Box::new(MissileExecution::new(
            UnitSource::spawn(PlayerId(1), aim),
            aim,
        )));
        run(&mut scheduler, &mut world, 100);

        let damage = world.config().missile.damage;
        assert_eq!(world.unit(own).unwrap().health, 2000 - damage);
        assert_eq!(world.unit(foe).unwrap().health, 2000 - damage);
        assert_eq!(world.players().get(PlayerId(1)).unwrap().gold, 800);
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn test_destroyed_missile_never_detonates() {
        let mut world = world();
        let silo = world.map().tile_ref(5, 70);
        world.place_unit(PlayerId(1), UnitKind::MissileSilo, silo);
        let aim = world.map().tile_ref(60, 60);
        let foe = world.place_unit(PlayerId(2), UnitKind::City, aim);

        let mut scheduler = ExecutionScheduler::new();
        scheduler.add_execution(Box::new(MissileExecution::new(
            UnitSource::spawn(PlayerId(1), aim),
            aim,
        )));
        run(&mut scheduler, &mut world, 2);
        let missile = world.player_units(PlayerId(1), UnitKind::Missile)[0].id;
        world.damage_unit(missile, u32::MAX);
        run(&mut scheduler, &mut world, 100);

        assert_eq!(world.unit(foe).unwrap().health, 2000);
        assert_eq!(scheduler.live_count(), 0);
    }
}
