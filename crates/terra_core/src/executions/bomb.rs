//! Free-falling bombs.

use super::{detonate, fixed_speed};
use crate::execution::{Execution, ExecutionContext};
use crate::map::TileRef;
use crate::movers::{MoverStep, ParabolaMover};
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BombState {
    Released,
    Falling { unit: UnitId },
    Done,
}

/// A bomb dropped by a bomber. Follows a flat arc to its aim point and
/// damages every hostile unit in the blast radius.
#[derive(Debug)]
pub struct BombExecution {
    owner: PlayerId,
    origin: TileRef,
    target: TileRef,
    mover: ParabolaMover,
    state: BombState,
}

impl BombExecution {
    /// Release a bomb at `origin` aimed at `target`.
    #[must_use]
    pub fn new(owner: PlayerId, origin: TileRef, target: TileRef) -> Self {
        Self {
            owner,
            origin,
            target,
            mover: ParabolaMover::new(),
            state: BombState::Released,
        }
    }
}

impl Execution for BombExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let world = &mut *ctx.world;
        let speed = fixed_speed(world.config().bomb.speed);
        self.mover
            .compute_control_points(world.map(), self.origin, self.target, speed, false);
        let unit = world.place_unit(self.owner, UnitKind::Bomb, self.origin);
        self.state = BombState::Falling { unit };
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        let BombState::Falling { unit } = self.state else {
            return;
        };
        let world = &mut *ctx.world;
        if !world.is_alive(unit) {
            self.state = BombState::Done;
            return;
        }

        let blast = world.config().bomb;
        match self.mover.next_tile(world.map(), fixed_speed(blast.speed)) {
            MoverStep::Next(tile) => world.move_unit(unit, tile),
            MoverStep::Arrived => {
                world.move_unit(unit, self.target);
                detonate(world, UnitKind::Bomb, self.owner, unit, self.target, blast, true);
                world.delete_unit(unit);
                self.state = BombState::Done;
            }
        }
    }

    fn is_active(&self) -> bool {
        self.state != BombState::Done
    }

    fn name(&self) -> &'static str {
        "bomb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::{GameMap, GridMap, TerrainType};
    use crate::players::Player;
    use crate::scheduler::ExecutionScheduler;
    use crate::world::{GameEvent, World};

    #[test]
    fn test_bomb_hits_hostiles_only() {
        let map = GridMap::filled(30, 30, TerrainType::Plains).unwrap();
        let mut world = World::new(Box::new(map), GameConfig::default());
        world.add_player(Player::new(PlayerId(1), "red"));
        world.add_player(Player::new(PlayerId(2), "blue"));
        let aim = world.map().tile_ref(10, 10);
        let own = world.place_unit(PlayerId(1), UnitKind::Bomber, aim);
        let foe = world.place_unit(PlayerId(2), UnitKind::City, world.map().tile_ref(11, 10));
        let far = world.place_unit(PlayerId(2), UnitKind::City, world.map().tile_ref(20, 10));

        let mut scheduler = ExecutionScheduler::new();
        scheduler.add_execution(Box::new(BombExecution::new(PlayerId(1), aim, aim)));
        for _ in 0..3 {
            scheduler.run_tick(&mut world);
            world.advance_tick();
        }

        let blast = world.config().bomb;
        assert_eq!(world.unit(own).unwrap().health, 150);
        assert_eq!(world.unit(foe).unwrap().health, 2000 - blast.damage);
        assert_eq!(world.unit(far).unwrap().health, 2000);
        assert!(world.player_units(PlayerId(1), UnitKind::Bomb).is_empty());
        assert!(world
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::Detonation { kind: UnitKind::Bomb, .. })));
        assert_eq!(scheduler.live_count(), 0);
    }
}
