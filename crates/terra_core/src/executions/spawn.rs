//! Spawn-phase city placement.

use crate::execution::{Execution, ExecutionContext};
use crate::map::TileRef;
use crate::players::PlayerId;
use crate::units::UnitKind;

/// Places a player's starting city.
///
/// Only acts during the spawn phase. A player who already has a city has
/// it moved to the new tile instead.
#[derive(Debug)]
pub struct SpawnExecution {
    player: PlayerId,
    tile: TileRef,
    done: bool,
}

impl SpawnExecution {
    /// Start `player` at `tile`.
    #[must_use]
    pub fn new(player: PlayerId, tile: TileRef) -> Self {
        Self {
            player,
            tile,
            done: false,
        }
    }
}

impl Execution for SpawnExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        if !ctx.world.players().contains(self.player) {
            tracing::warn!(player = %self.player, "spawn for unknown player");
            self.done = true;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.done = true;
        let world = &mut *ctx.world;
        if !world.is_spawn_phase() {
            world.advise(self.player, "spawn phase is over");
            return;
        }
        let existing = world
            .player_units(self.player, UnitKind::City)
            .first()
            .map(|city| city.id);

        if let Some(city) = existing {
            if world.map().is_land(self.tile) && world.is_free_site(self.tile) {
                world.move_unit(city, self.tile);
            } else {
                world.advise(self.player, format!("cannot spawn at {}", self.tile));
            }
            return;
        }

        let Some(tile) = world.can_build(self.player, UnitKind::City, self.tile) else {
            world.advise(self.player, format!("cannot spawn at {}", self.tile));
            return;
        };
        let spawn = world.config().spawn;
        let city = world.build_unit(self.player, UnitKind::City, tile);
        world.set_troops(city, spawn.city_troops);
        if let Some(player) = world.players_mut().get_mut(self.player) {
            player.gold = player.gold.saturating_add(spawn.starting_gold);
        }
        tracing::info!(player = %self.player, tile = %tile, "player spawned");
    }

    fn is_active(&self) -> bool {
        !self.done
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "spawn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::{GameMap, GridMap};
    use crate::players::Player;
    use crate::scheduler::ExecutionScheduler;
    use crate::world::{GameEvent, World};

    fn setup() -> (World, ExecutionScheduler) {
        let map = GridMap::from_ascii(&[
            "~~~~~~", //
            "~~####", //
            "~~####", //
        ])
        .unwrap();
        let config = GameConfig {
            spawn_phase_ticks: 5,
            ..GameConfig::default()
        };
        let mut world = World::new(Box::new(map), config);
        world.add_player(Player::new(PlayerId(1), "red"));
        (world, ExecutionScheduler::new())
    }

    fn run(scheduler: &mut ExecutionScheduler, world: &mut World, ticks: u64) {
        for _ in 0..ticks {
            scheduler.run_tick(world);
            world.advance_tick();
        }
    }

    #[test]
    fn test_spawn_places_city_during_spawn_phase() {
        let (mut world, mut scheduler) = setup();
        let tile = world.map().tile_ref(3, 1);
        scheduler.add_execution(Box::new(SpawnExecution::new(PlayerId(1), tile)));
        run(&mut scheduler, &mut world, 2);

        let cities = world.player_units(PlayerId(1), UnitKind::City);
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].tile, tile);
        assert_eq!(cities[0].troops, world.config().spawn.city_troops);
        assert_eq!(
            world.players().get(PlayerId(1)).unwrap().gold,
            world.config().spawn.starting_gold
        );
        assert!(world.is_spawn_phase());
    }

    #[test]
    fn test_respawn_moves_city() {
        let (mut world, mut scheduler) = setup();
        scheduler.add_execution(Box::new(SpawnExecution::new(PlayerId(1), world.map().tile_ref(3, 1))));
        run(&mut scheduler, &mut world, 2);
        let moved = world.map().tile_ref(5, 2);
        scheduler.add_execution(Box::new(SpawnExecution::new(PlayerId(1), moved)));
        run(&mut scheduler, &mut world, 2);

        let cities = world.player_units(PlayerId(1), UnitKind::City);
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].tile, moved);
    }

    #[test]
    fn test_water_spawn_rejected() {
        let (mut world, mut scheduler) = setup();
        scheduler.add_execution(Box::new(SpawnExecution::new(PlayerId(1), world.map().tile_ref(0, 0))));
        run(&mut scheduler, &mut world, 2);
        assert!(world.player_units(PlayerId(1), UnitKind::City).is_empty());
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn test_no_city_after_spawn_phase() {
        let (mut world, mut scheduler) = setup();
        run(&mut scheduler, &mut world, 5);
        assert!(!world.is_spawn_phase());
        scheduler.add_execution(Box::new(SpawnExecution::new(PlayerId(1), world.map().tile_ref(3, 1))));
        run(&mut scheduler, &mut world, 2);

        assert!(world.player_units(PlayerId(1), UnitKind::City).is_empty());
        assert_eq!(world.players().get(PlayerId(1)).unwrap().gold, 0);
        assert!(world
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::Advisory { .. })));
    }
}
