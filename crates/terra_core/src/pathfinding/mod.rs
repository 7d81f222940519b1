//! Time-sliced pathfinding.
//!
//! A search is advanced a bounded number of node expansions per call so
//! that long routes are spread across ticks instead of stalling one.
//! [`PathFinder`] wraps a search back-end with a cached route and the
//! recompute-tolerance policy; executions only ever talk to it.

mod astar;
mod coarse;
mod finder;
mod terrain;

pub use astar::{SearchLimits, SearchStatus};
pub use coarse::{CoarseSearch, COARSE_FACTOR};
pub use finder::{PathFinder, PathStep, RecomputePolicy, SearchStrategy, MAX_RESOLVE_PASSES};
pub use terrain::{TerrainSearch, Traversal};

use crate::map::{GameMap, TileRef};

/// An in-progress bounded search from an origin to a destination.
///
/// Object-safe so that [`PathFinder`] can hold either back-end.
pub trait BoundedSearch: Send {
    /// Advance the search by at most one call's worth of iterations.
    fn step(&mut self, map: &dyn GameMap) -> SearchStatus;

    /// The found route, origin first and destination last.
    ///
    /// Empty unless the last [`step`](Self::step) returned
    /// [`SearchStatus::Completed`].
    fn path(&self, map: &dyn GameMap) -> Vec<TileRef>;
}
