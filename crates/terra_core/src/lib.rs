//! # Terra Core
//!
//! Deterministic simulation core for a territorial strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond config loading
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Lockstep multiplayer (identical simulation across clients)
//! - Headless batch runs
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Core simulation loop
//! - [`scheduler`] - Execution scheduler
//! - [`execution`] - The execution trait and unit sources
//! - [`executions`] - Gameplay executions (aircraft, ships, projectiles, structures)
//! - [`pathfinding`] - Incremental A* and the path finder
//! - [`movers`] - Straight-line, parabolic and aircraft movement
//! - [`targeting`] - Shared target selection
//! - [`world`] - Units, players and placement rules
//! - [`map`] - Tile grid abstraction
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod execution;
pub mod executions;
pub mod map;
pub mod math;
pub mod movers;
pub mod pathfinding;
pub mod players;
pub mod scheduler;
pub mod simulation;
pub mod targeting;
pub mod units;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::GameConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::execution::{Execution, ExecutionContext, SpawnRequest, UnitSource};
    pub use crate::executions::{
        AirDefenseExecution, BombExecution, BomberExecution, ConstructionExecution,
        FighterExecution, InterceptorExecution, MissileExecution, ShellExecution,
        SpawnExecution, TransportShipExecution, WarshipExecution,
    };
    pub use crate::map::{GameMap, GridMap, TerrainType, TileRef};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::pathfinding::{PathFinder, PathStep, SearchStrategy, Traversal};
    pub use crate::players::{Player, PlayerId};
    pub use crate::scheduler::ExecutionScheduler;
    pub use crate::simulation::{Simulation, TickEvents, WorldSnapshot};
    pub use crate::units::{Unit, UnitId, UnitKind};
    pub use crate::world::{GameEvent, World};
}
