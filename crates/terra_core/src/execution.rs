//! The schedulable unit of game behaviour.
//!
//! An [`Execution`] is a long-lived state machine for one agent: a unit,
//! a structure or a projectile. The scheduler calls
//! [`init`](Execution::init) exactly once, then [`tick`](Execution::tick)
//! once per simulation tick until [`is_active`](Execution::is_active)
//! reports false.

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::players::PlayerId;
use crate::units::UnitId;
use crate::world::World;

/// A schedulable state machine.
pub trait Execution: Send {
    /// Called once before the first tick. May spawn children.
    fn init(&mut self, ctx: &mut ExecutionContext<'_>);

    /// Advance one tick. Only called while active.
    fn tick(&mut self, ctx: &mut ExecutionContext<'_>);

    /// False once the execution has reached its terminal state.
    fn is_active(&self) -> bool;

    /// Whether to run while the spawn phase is on.
    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// What an execution gets to work with during `init` and `tick`.
pub struct ExecutionContext<'a> {
    /// Authoritative game state.
    pub world: &'a mut World,
    spawned: &'a mut Vec<Box<dyn Execution>>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(world: &'a mut World, spawned: &'a mut Vec<Box<dyn Execution>>) -> Self {
        Self { world, spawned }
    }

    /// Register a child execution. It is initialized at the end of this
    /// tick and ticked for the first time on the next one.
    pub fn spawn(&mut self, execution: impl Execution + 'static) {
        tracing::trace!(child = execution.name(), "execution spawned");
        self.spawned.push(Box::new(execution));
    }

    /// Index of the tick being processed.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.world.tick()
    }
}

/// Where to place a unit that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Who will own the unit.
    pub owner: PlayerId,
    /// Requested placement; the world may substitute a launch site.
    pub tile: TileRef,
}

/// The unit an execution drives: one that already exists, or one to build.
///
/// Consumed once, during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSource {
    /// Take control of a unit already in the registry.
    Existing(UnitId),
    /// Build a new unit.
    Spawn(SpawnRequest),
}

impl UnitSource {
    /// Shorthand for [`UnitSource::Spawn`].
    #[must_use]
    pub const fn spawn(owner: PlayerId, tile: TileRef) -> Self {
        Self::Spawn(SpawnRequest { owner, tile })
    }
}
