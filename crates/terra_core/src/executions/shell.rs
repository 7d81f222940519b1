//! Gun shells fired by fighters and warships.

use super::fixed_speed;
use crate::execution::{Execution, ExecutionContext};
use crate::map::TileRef;
use crate::movers::{MoverStep, StraightLineMover};
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellState {
    Loaded,
    Flying { unit: UnitId, age: u32 },
    Done,
}

/// A shell chasing one unit in a straight line.
///
/// Re-aims at the target's current tile every tick. Vanishes if the
/// target disappears or the shell outlives its lifetime.
#[derive(Debug)]
pub struct ShellExecution {
    owner: PlayerId,
    origin: TileRef,
    target: UnitId,
    damage: u32,
    state: ShellState,
}

impl ShellExecution {
    /// Fire from `origin` at `target`.
    #[must_use]
    pub fn new(owner: PlayerId, origin: TileRef, target: UnitId, damage: u32) -> Self {
        Self {
            owner,
            origin,
            target,
            damage,
            state: ShellState::Loaded,
        }
    }
}

impl Execution for ShellExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let unit = ctx.world.place_unit(self.owner, UnitKind::Shell, self.origin);
        ctx.world.set_target(unit, Some(self.target));
        self.state = ShellState::Flying { unit, age: 0 };
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        let ShellState::Flying { unit, age } = self.state else {
            return;
        };
        let world = &mut *ctx.world;
        let Some(current) = world.unit(unit).map(|u| u.tile) else {
            self.state = ShellState::Done;
            return;
        };

        let cfg = world.config().shell;
        let age = age + 1;
        let target_tile = world.unit(self.target).map(|t| t.tile);
        let Some(target_tile) = target_tile.filter(|_| age <= cfg.lifetime_ticks) else {
            world.delete_unit(unit);
            self.state = ShellState::Done;
            return;
        };

        match StraightLineMover.next_tile(world.map(), current, target_tile, fixed_speed(cfg.speed)) {
            MoverStep::Next(tile) => {
                world.move_unit(unit, tile);
                self.state = ShellState::Flying { unit, age };
            }
            MoverStep::Arrived => {
                world.move_unit(unit, target_tile);
                world.damage_unit(self.target, self.damage);
                world.delete_unit(unit);
                self.state = ShellState::Done;
            }
        }
    }

    fn is_active(&self) -> bool {
        self.state != ShellState::Done
    }

    fn name(&self) -> &'static str {
        "shell"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::{GameMap, GridMap, TerrainType};
    use crate::players::Player;
    use crate::scheduler::ExecutionScheduler;
    use crate::world::World;

    fn setup(lifetime_ticks: u32) -> (World, ExecutionScheduler) {
        let map = GridMap::filled(100, 10, TerrainType::Ocean).unwrap();
        let mut config = GameConfig::default();
        config.shell.lifetime_ticks = lifetime_ticks;
        let mut world = World::new(Box::new(map), config);
        world.add_player(Player::new(PlayerId(1), "red"));
        world.add_player(Player::new(PlayerId(2), "blue"));
        (world, ExecutionScheduler::new())
    }

    fn run(scheduler: &mut ExecutionScheduler, world: &mut World, ticks: u64) {
        for _ in 0..ticks {
            scheduler.run_tick(world);
            world.advance_tick();
        }
    }

    #[test]
    fn test_shell_hits_target() {
        let (mut world, mut scheduler) = setup(30);
        let target = world.place_unit(PlayerId(2), UnitKind::Warship, world.map().tile_ref(20, 5));
        let origin = world.map().tile_ref(0, 5);
        scheduler.add_execution(Box::new(ShellExecution::new(PlayerId(1), origin, target, 50)));
        run(&mut scheduler, &mut world, 7);

        assert_eq!(world.unit(target).unwrap().health, 350);
        assert!(world.player_units(PlayerId(1), UnitKind::Shell).is_empty());
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn test_shell_expires() {
        let (mut world, mut scheduler) = setup(3);
        let target = world.place_unit(PlayerId(2), UnitKind::Warship, world.map().tile_ref(90, 5));
        let origin = world.map().tile_ref(0, 5);
        scheduler.add_execution(Box::new(ShellExecution::new(PlayerId(1), origin, target, 50)));
        run(&mut scheduler, &mut world, 5);

        assert_eq!(world.unit(target).unwrap().health, 400);
        assert!(world.player_units(PlayerId(1), UnitKind::Shell).is_empty());
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn test_shell_vanishes_with_target() {
        let (mut world, mut scheduler) = setup(30);
        let target = world.place_unit(PlayerId(2), UnitKind::Warship, world.map().tile_ref(50, 5));
        let origin = world.map().tile_ref(0, 5);
        scheduler.add_execution(Box::new(ShellExecution::new(PlayerId(1), origin, target, 50)));
        run(&mut scheduler, &mut world, 2);
        world.delete_unit(target);
        run(&mut scheduler, &mut world, 1);
        assert!(world.player_units(PlayerId(1), UnitKind::Shell).is_empty());
        assert_eq!(scheduler.live_count(), 0);
    }
}
