//! Core simulation loop.
//!
//! [`Simulation`] pairs the [`World`] with the [`ExecutionScheduler`] that
//! drives it. Each call to [`tick`](Simulation::tick) runs every live
//! execution once, initializes whatever was queued, advances the tick
//! counter and hands back the events recorded along the way.
//!
//! # Determinism
//!
//! Everything reachable from a tick is deterministic:
//! - No floating-point math (movers use fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness (every RNG is seeded from the config seed)
//! - Consistent iteration order (units in id order, executions in
//!   registration order)
//! - Same inputs always produce same outputs
//!
//! Two simulations built from the same map, config and orders produce the
//! same [`state_hash`](Simulation::state_hash) after every tick.
//!
//! # Example
//!
//! ```
//! use terra_core::config::GameConfig;
//! use terra_core::executions::SpawnExecution;
//! use terra_core::map::{GameMap, GridMap, TerrainType};
//! use terra_core::players::{Player, PlayerId};
//! use terra_core::simulation::Simulation;
//!
//! let map = GridMap::filled(32, 32, TerrainType::Plains).unwrap();
//! let spawn = map.tile_ref(4, 4);
//! let config = GameConfig {
//!     spawn_phase_ticks: 10,
//!     ..GameConfig::default()
//! };
//! let mut sim = Simulation::new(Box::new(map), config);
//! sim.world_mut().add_player(Player::new(PlayerId(1), "red"));
//! sim.add_execution(SpawnExecution::new(PlayerId(1), spawn));
//!
//! sim.tick();
//! sim.tick();
//! assert_eq!(sim.get_tick(), 2);
//! assert!(sim.is_spawn_phase());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::execution::Execution;
use crate::map::GameMap;
use crate::players::PlayerRegistry;
use crate::scheduler::ExecutionScheduler;
use crate::units::UnitStorage;
use crate::world::{GameEvent, World};

/// Events generated during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Index of the tick that produced these events.
    pub tick: u64,
    /// Everything that happened, in the order it happened.
    pub events: Vec<GameEvent>,
}

/// Serializable copy of the mutable world state.
///
/// The map and config are inputs, not state, and are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Next tick to be processed.
    pub tick: u64,
    /// Every unit.
    pub units: UnitStorage,
    /// Every player.
    pub players: PlayerRegistry,
}

impl WorldSnapshot {
    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Snapshot`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize snapshot: {e}")))
    }

    /// Decode bytes produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Snapshot`] if the bytes are not a snapshot.
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize snapshot: {e}")))
    }

    /// Same value as [`Simulation::state_hash`] for the state it was
    /// taken from.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        hash_state(self.tick, &self.units, &self.players)
    }
}

fn hash_state(tick: u64, units: &UnitStorage, players: &PlayerRegistry) -> u64 {
    let mut hasher = DefaultHasher::new();

    // Hash tick
    tick.hash(&mut hasher);

    // Units in id order
    units.len().hash(&mut hasher);
    for unit in units.iter() {
        unit.id.hash(&mut hasher);
        unit.kind.hash(&mut hasher);
        unit.owner.hash(&mut hasher);
        unit.tile.hash(&mut hasher);
        unit.health.hash(&mut hasher);
        unit.max_health.hash(&mut hasher);
        unit.target.hash(&mut hasher);
        unit.troops.hash(&mut hasher);
        unit.constructing.hash(&mut hasher);
    }

    // Players in id order
    players.len().hash(&mut hasher);
    for player in players.iter() {
        player.id.hash(&mut hasher);
        player.gold.hash(&mut hasher);
        player.troops.hash(&mut hasher);
        player.allies.hash(&mut hasher);
    }

    hasher.finish()
}

/// The core game simulation.
///
/// Owns the world and every execution acting on it. Orders from outside
/// the simulation arrive as executions through
/// [`add_execution`](Self::add_execution).
#[derive(Debug)]
pub struct Simulation {
    world: World,
    scheduler: ExecutionScheduler,
}

impl Simulation {
    /// Create a simulation at tick 0 with no players and no units.
    #[must_use]
    pub fn new(map: Box<dyn GameMap>, config: GameConfig) -> Self {
        Self::from_world(World::new(map, config))
    }

    /// Wrap an already populated world.
    #[must_use]
    pub fn from_world(world: World) -> Self {
        Self {
            world,
            scheduler: ExecutionScheduler::new(),
        }
    }

    /// Queue an execution. It is initialized at the end of the next tick.
    pub fn add_execution(&mut self, execution: impl Execution + 'static) {
        self.scheduler.add_execution(Box::new(execution));
    }

    /// Get the current tick number.
    ///
    /// Starts at 0 and increments by 1 each time [`tick()`](Self::tick) is
    /// called.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.world.tick()
    }

    /// Whether the next tick falls in the spawn phase.
    #[must_use]
    pub fn is_spawn_phase(&self) -> bool {
        self.world.is_spawn_phase()
    }

    /// The game state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable game state, for setting up scenarios between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &ExecutionScheduler {
        &self.scheduler
    }

    /// Advance the simulation by one tick.
    ///
    /// # Example
    ///
    /// ```
    /// use terra_core::config::GameConfig;
    /// use terra_core::map::{GridMap, TerrainType};
    /// use terra_core::simulation::Simulation;
    ///
    /// let map = GridMap::filled(8, 8, TerrainType::Ocean).unwrap();
    /// let mut sim = Simulation::new(Box::new(map), GameConfig::default());
    /// let events = sim.tick();
    /// assert_eq!(events.tick, 0);
    /// assert_eq!(sim.get_tick(), 1);
    /// ```
    pub fn tick(&mut self) -> TickEvents {
        let tick = self.world.tick();
        self.scheduler.run_tick(&mut self.world);
        self.world.advance_tick();

        let events = TickEvents {
            tick,
            events: self.world.drain_events(),
        };

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Run `ticks` ticks and collect every event.
    pub fn run(&mut self, ticks: u64) -> Vec<GameEvent> {
        (0..ticks).flat_map(|_| self.tick().events).collect()
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Used for desync detection. Two simulations with identical state
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        hash_state(
            self.world.tick(),
            self.world.units(),
            self.world.players(),
        )
    }

    /// Copy out the mutable world state.
    #[must_use]
    pub fn snapshot_state(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.world.tick(),
            units: self.world.units().clone(),
            players: self.world.players().clone(),
        }
    }

    /// Serialize the world state for replay comparison or network sync.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        self.snapshot_state().encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::UnitSource;
    use crate::executions::{FighterExecution, SpawnExecution};
    use crate::map::{GridMap, TerrainType};
    use crate::players::{Player, PlayerId};
    use crate::units::UnitKind;

    fn skirmish(seed: u64) -> Simulation {
        let map = GridMap::filled(64, 64, TerrainType::Plains).unwrap();
        let config = GameConfig {
            seed,
            spawn_phase_ticks: 2,
            ..GameConfig::default()
        };
        let mut sim = Simulation::new(Box::new(map), config);
        for (id, name, x) in [(1, "red", 10), (2, "blue", 50)] {
            sim.world_mut().add_player(Player::new(PlayerId(id), name));
            let tile = sim.world().map().tile_ref(x, 32);
            sim.add_execution(SpawnExecution::new(PlayerId(id), tile));
            let field = sim.world().map().tile_ref(x, 30);
            sim.world_mut().place_unit(PlayerId(id), UnitKind::Airfield, field);
            sim.add_execution(FighterExecution::new(UnitSource::spawn(PlayerId(id), field)));
        }
        sim
    }

    #[test]
    fn test_simulation_new() {
        let map = GridMap::filled(4, 4, TerrainType::Ocean).unwrap();
        let sim = Simulation::new(Box::new(map), GameConfig::default());
        assert_eq!(sim.get_tick(), 0);
        assert!(sim.world().units().is_empty());
        assert_eq!(sim.scheduler().live_count(), 0);
    }

    #[test]
    fn test_tick_increments() {
        let mut sim = skirmish(1);
        assert!(sim.is_spawn_phase());
        for expected in 0..5 {
            assert_eq!(sim.tick().tick, expected);
        }
        assert_eq!(sim.get_tick(), 5);
        assert!(!sim.is_spawn_phase());
    }

    #[test]
    fn test_spawn_phase_then_fighters_launch() {
        let mut sim = skirmish(1);
        let events = sim.run(4);
        let built: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::UnitBuilt { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            built,
            vec![
                UnitKind::Airfield,
                UnitKind::Airfield,
                UnitKind::City,
                UnitKind::City,
                UnitKind::Fighter,
                UnitKind::Fighter,
            ]
        );
    }

    #[test]
    fn test_deterministic_hash() {
        let mut sim1 = skirmish(42);
        let mut sim2 = skirmish(42);

        for _ in 0..100 {
            sim1.tick();
            sim2.tick();
            assert_eq!(sim1.state_hash(), sim2.state_hash());
        }
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut sim = skirmish(7);
        sim.run(30);

        let bytes = sim.snapshot().unwrap();
        let restored = WorldSnapshot::decode(&bytes).unwrap();

        assert_eq!(restored.tick, sim.get_tick());
        assert_eq!(restored, sim.snapshot_state());
        assert_eq!(restored.state_hash(), sim.state_hash());
    }

    #[test]
    fn test_garbage_snapshot_is_an_error() {
        let err = WorldSnapshot::decode(&[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, GameError::Snapshot(_)));
    }
}
