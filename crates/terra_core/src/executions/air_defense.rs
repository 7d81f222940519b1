//! Air defense batteries.

use super::InterceptorExecution;
use crate::execution::{Execution, ExecutionContext};
use crate::targeting::{select_target, TargetQuery, AIR_DEFENSE_PRIORITIES};
use crate::units::{UnitId, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatteryState {
    Arming,
    Ready { ticks_since_launch: u32 },
    Done,
}

/// Launches interceptors at missiles and bombers in range.
///
/// One launch per cooldown, at a target no friendly interceptor has
/// claimed yet. Ends when the structure is gone.
#[derive(Debug)]
pub struct AirDefenseExecution {
    structure: UnitId,
    state: BatteryState,
}

impl AirDefenseExecution {
    /// Operate the air defense structure `structure`.
    #[must_use]
    pub fn new(structure: UnitId) -> Self {
        Self {
            structure,
            state: BatteryState::Arming,
        }
    }
}

impl Execution for AirDefenseExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let valid = ctx
            .world
            .unit(self.structure)
            .is_some_and(|u| u.kind == UnitKind::AirDefense);
        self.state = if valid {
            BatteryState::Ready {
                ticks_since_launch: ctx.world.config().air_defense.cooldown_ticks,
            }
        } else {
            tracing::warn!(unit = self.structure, "air defense battery without a structure");
            BatteryState::Done
        };
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        let BatteryState::Ready { ticks_since_launch } = self.state else {
            return;
        };
        let Some(site) = ctx.world.unit(self.structure) else {
            self.state = BatteryState::Done;
            return;
        };
        let (owner, origin) = (site.owner, site.tile);
        let cfg = ctx.world.config().air_defense;

        let mut ticks_since_launch = ticks_since_launch.saturating_add(1);
        if ticks_since_launch >= cfg.cooldown_ticks {
            let claimed = ctx
                .world
                .claimed_targets(owner, UnitKind::Interceptor, None);
            let target = select_target(
                ctx.world,
                &TargetQuery {
                    seeker: Some(self.structure),
                    owner,
                    origin,
                    range: cfg.range,
                    priorities: AIR_DEFENSE_PRIORITIES,
                    claimed: &claimed,
                },
            );
            if let Some(target) = target {
                tracing::debug!(battery = self.structure, target, "interceptor away");
                ctx.spawn(InterceptorExecution::new(owner, origin, target));
                ticks_since_launch = 0;
            }
        }
        self.state = BatteryState::Ready { ticks_since_launch };
    }

    fn is_active(&self) -> bool {
        self.state != BatteryState::Done
    }

    fn name(&self) -> &'static str {
        "air_defense"
    }
}
