//! Execution scheduler.
//!
//! The scheduler keeps two buffers: the live set, iterated every tick,
//! and a pending queue of executions waiting for `init`. The live set is
//! never mutated while it is being iterated; children spawned during a
//! tick go to the pending queue and are merged in after every live
//! execution has ticked.
//!
//! # Tick order
//!
//! 1. Tick each live, active execution in registration order, skipping
//!    those not active during the spawn phase while it is on.
//! 2. Initialize pending executions: externally added ones first, then
//!    children spawned in step 1. Spawn-phase-excluded ones stay pending.
//!    Children spawned during `init` wait for the next tick's pass.
//! 3. Drop every execution that is no longer active and append the newly
//!    initialized ones to the live set.

use crate::execution::{Execution, ExecutionContext};
use crate::world::World;

/// Owns and drives every execution in the game.
#[derive(Default)]
pub struct ExecutionScheduler {
    live: Vec<Box<dyn Execution>>,
    pending: Vec<Box<dyn Execution>>,
}

impl ExecutionScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an execution. It is initialized at the end of the next tick
    /// and ticked from the one after.
    pub fn add_execution(&mut self, execution: Box<dyn Execution>) {
        self.pending.push(execution);
    }

    /// Executions that have been initialized and are still active.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Executions waiting for `init`.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Names of the live executions in tick order.
    #[must_use]
    pub fn live_names(&self) -> Vec<&'static str> {
        self.live.iter().map(|e| e.name()).collect()
    }

    /// Run one tick against `world`.
    pub fn run_tick(&mut self, world: &mut World) {
        let spawn_phase = world.is_spawn_phase();
        let mut spawned: Vec<Box<dyn Execution>> = Vec::new();

        for execution in &mut self.live {
            if !execution.is_active() {
                continue;
            }
            if spawn_phase && !execution.active_during_spawn_phase() {
                continue;
            }
            let mut ctx = ExecutionContext::new(world, &mut spawned);
            execution.tick(&mut ctx);
        }

        let mut to_init = std::mem::take(&mut self.pending);
        to_init.append(&mut spawned);

        let mut initialized = Vec::with_capacity(to_init.len());
        let mut next_pending = Vec::new();
        let mut init_children = Vec::new();
        for mut execution in to_init {
            if spawn_phase && !execution.active_during_spawn_phase() {
                next_pending.push(execution);
                continue;
            }
            let mut ctx = ExecutionContext::new(world, &mut init_children);
            execution.init(&mut ctx);
            tracing::trace!(execution = execution.name(), tick = world.tick(), "initialized");
            initialized.push(execution);
        }
        next_pending.append(&mut init_children);
        self.pending = next_pending;

        self.live.retain(|e| e.is_active());
        self.live
            .extend(initialized.into_iter().filter(|e| e.is_active()));

        #[cfg(feature = "debug-validation")]
        assert!(
            self.live.iter().all(|e| e.is_active()),
            "inactive execution survived retirement"
        );
    }
}

impl std::fmt::Debug for ExecutionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionScheduler")
            .field("live", &self.live_names())
            .field("pending", &self.pending.len())
            .finish()
    }
}
