//! Interceptors launched by air defense batteries.

use super::fixed_speed;
use crate::execution::{Execution, ExecutionContext};
use crate::map::TileRef;
use crate::movers::{MoverStep, StraightLineMover};
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterceptorState {
    Ready,
    Chasing { unit: UnitId, age: u32 },
    Done,
}

/// Chases one missile or bomber and destroys it on contact.
///
/// The interceptor unit records its target so sibling batteries can see
/// the claim and pick something else.
#[derive(Debug)]
pub struct InterceptorExecution {
    owner: PlayerId,
    origin: TileRef,
    target: UnitId,
    state: InterceptorState,
}

impl InterceptorExecution {
    /// Launch from `origin` at `target`.
    #[must_use]
    pub fn new(owner: PlayerId, origin: TileRef, target: UnitId) -> Self {
        Self {
            owner,
            origin,
            target,
            state: InterceptorState::Ready,
        }
    }
}

impl Execution for InterceptorExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let unit = ctx
            .world
            .place_unit(self.owner, UnitKind::Interceptor, self.origin);
        ctx.world.set_target(unit, Some(self.target));
        self.state = InterceptorState::Chasing { unit, age: 0 };
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        let InterceptorState::Chasing { unit, age } = self.state else {
            return;
        };
        let world = &mut *ctx.world;
        let Some(current) = world.unit(unit).map(|u| u.tile) else {
            self.state = InterceptorState::Done;
            return;
        };

        let cfg = world.config().interceptor;
        let age = age + 1;
        let target_tile = world.unit(self.target).map(|t| t.tile);
        let Some(target_tile) = target_tile.filter(|_| age <= cfg.lifetime_ticks) else {
            world.delete_unit(unit);
            self.state = InterceptorState::Done;
            return;
        };

        match StraightLineMover.next_tile(world.map(), current, target_tile, fixed_speed(cfg.speed)) {
            MoverStep::Next(tile) => {
                world.move_unit(unit, tile);
                self.state = InterceptorState::Chasing { unit, age };
            }
            MoverStep::Arrived => {
                world.move_unit(unit, target_tile);
                tracing::debug!(unit, target = self.target, "intercepted");
                world.damage_unit(self.target, u32::MAX);
                world.delete_unit(unit);
                self.state = InterceptorState::Done;
            }
        }
    }

    fn is_active(&self) -> bool {
        self.state != InterceptorState::Done
    }

    fn name(&self) -> &'static str {
        "interceptor"
    }
}
