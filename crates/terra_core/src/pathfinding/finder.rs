//! Per-agent pathfinding session with route caching.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::astar::{SearchLimits, SearchStatus};
use super::coarse::CoarseSearch;
use super::terrain::{TerrainSearch, Traversal};
use super::BoundedSearch;
use crate::map::{GameMap, TileRef};

/// Upper bound on state transitions resolved within one
/// [`PathFinder::next_tile`] call.
///
/// The longest chain is start search, complete it, pop the first tile.
pub const MAX_RESOLVE_PASSES: usize = 3;

/// Result of asking a [`PathFinder`] for the next tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    /// Within `close_enough` of the destination; carries the current tile.
    Completed(TileRef),
    /// Move to this tile.
    Next(TileRef),
    /// Search still running; ask again next tick.
    Pending,
    /// No route exists or the search budget ran out.
    PathNotFound,
}

/// How far the destination may drift before a cached route is thrown away.
///
/// The tolerance depends on the Manhattan distance still to go: far-away
/// agents keep their route through small drifts, close agents always
/// re-plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecomputePolicy {
    /// Distances above this use `far_tolerance`.
    pub far_distance: u32,
    /// Drift tolerated when far away.
    pub far_tolerance: u32,
    /// Distances above this (and not far) use `mid_tolerance`.
    pub mid_distance: u32,
    /// Drift tolerated at medium range.
    pub mid_tolerance: u32,
    /// Drift tolerated at close range.
    pub near_tolerance: u32,
}

impl Default for RecomputePolicy {
    fn default() -> Self {
        Self {
            far_distance: 50,
            far_tolerance: 10,
            mid_distance: 25,
            mid_tolerance: 5,
            near_tolerance: 0,
        }
    }
}

impl RecomputePolicy {
    /// Drift tolerated when `distance` tiles remain.
    #[must_use]
    pub fn tolerance(&self, distance: u32) -> u32 {
        if distance > self.far_distance {
            self.far_tolerance
        } else if distance > self.mid_distance {
            self.mid_tolerance
        } else {
            self.near_tolerance
        }
    }

    /// Whether a route computed toward `route_destination` is stale for an
    /// agent at `current` now heading for `destination`.
    #[must_use]
    pub fn should_recompute(
        &self,
        map: &dyn GameMap,
        current: TileRef,
        destination: TileRef,
        route_destination: TileRef,
    ) -> bool {
        let drift = map.manhattan_dist(route_destination, destination);
        drift > self.tolerance(map.manhattan_dist(current, destination))
    }
}

/// Which search back-end a [`PathFinder`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Full-resolution [`TerrainSearch`].
    Terrain(Traversal),
    /// Half-resolution [`CoarseSearch`].
    Coarse(Traversal),
}

impl SearchStrategy {
    fn begin(
        self,
        map: &dyn GameMap,
        origin: TileRef,
        destination: TileRef,
        limits: SearchLimits,
    ) -> Box<dyn BoundedSearch> {
        match self {
            Self::Terrain(traversal) => Box::new(TerrainSearch::new(
                map,
                traversal,
                origin,
                destination,
                limits,
            )),
            Self::Coarse(traversal) => Box::new(CoarseSearch::new(
                map,
                traversal,
                origin,
                destination,
                limits,
            )),
        }
    }
}

/// A route and a search never coexist.
enum Session {
    Idle,
    Searching {
        search: Box<dyn BoundedSearch>,
        origin: TileRef,
        destination: TileRef,
    },
    RouteReady {
        /// Remaining tiles, origin already stripped.
        route: VecDeque<TileRef>,
        origin: TileRef,
        destination: TileRef,
    },
}

/// Incremental pathfinding for one agent.
///
/// Call [`next_tile`](Self::next_tile) once per tick with the agent's
/// current tile. Searches are time-sliced by the configured
/// [`SearchLimits`]; a completed route is cached and replayed until the
/// destination drifts past the [`RecomputePolicy`] tolerance.
pub struct PathFinder {
    strategy: SearchStrategy,
    limits: SearchLimits,
    policy: RecomputePolicy,
    session: Session,
}

impl PathFinder {
    /// Create an idle path finder.
    #[must_use]
    pub fn new(strategy: SearchStrategy, limits: SearchLimits, policy: RecomputePolicy) -> Self {
        Self {
            strategy,
            limits,
            policy,
            session: Session::Idle,
        }
    }

    /// The back-end this finder runs.
    #[must_use]
    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Whether a search is in progress.
    #[must_use]
    pub fn is_searching(&self) -> bool {
        matches!(self.session, Session::Searching { .. })
    }

    /// Tiles left on the cached route, if one is ready.
    #[must_use]
    pub fn route_len(&self) -> Option<usize> {
        match &self.session {
            Session::RouteReady { route, .. } => Some(route.len()),
            _ => None,
        }
    }

    /// Drop any search or route.
    pub fn reset(&mut self) {
        self.session = Session::Idle;
    }

    /// Advance toward `destination` from `current`.
    ///
    /// # Panics
    ///
    /// Panics if a ready route is unexpectedly empty when popped.
    pub fn next_tile(
        &mut self,
        map: &dyn GameMap,
        current: TileRef,
        destination: TileRef,
        close_enough: u32,
    ) -> PathStep {
        if map.manhattan_dist(current, destination) < close_enough {
            return PathStep::Completed(current);
        }

        for _ in 0..MAX_RESOLVE_PASSES {
            match &mut self.session {
                Session::Idle => self.begin(map, current, destination),
                Session::RouteReady {
                    route,
                    destination: route_destination,
                    ..
                } => {
                    let stale = route.is_empty()
                        || self
                            .policy
                            .should_recompute(map, current, destination, *route_destination);
                    if stale {
                        self.begin(map, current, destination);
                        continue;
                    }
                    let Some(next) = route.pop_front() else {
                        panic!("PathFinder route empty after staleness check");
                    };
                    return PathStep::Next(next);
                }
                Session::Searching {
                    search,
                    origin,
                    destination: search_destination,
                } => match search.step(map) {
                    SearchStatus::Pending => return PathStep::Pending,
                    SearchStatus::PathNotFound => {
                        tracing::debug!(
                            origin = %origin,
                            destination = %search_destination,
                            "no path found"
                        );
                        self.session = Session::Idle;
                        return PathStep::PathNotFound;
                    }
                    SearchStatus::Completed => {
                        let (origin, route_destination) = (*origin, *search_destination);
                        let mut route: VecDeque<TileRef> = search.path(map).into();
                        if route.front() == Some(&origin) {
                            route.pop_front();
                        }
                        if route.is_empty() {
                            self.session = Session::Idle;
                            return PathStep::Completed(current);
                        }
                        self.session = Session::RouteReady {
                            route,
                            origin,
                            destination: route_destination,
                        };
                    }
                },
            }
        }

        tracing::warn!(current = %current, destination = %destination, "path resolution did not settle");
        PathStep::Pending
    }

    fn begin(&mut self, map: &dyn GameMap, origin: TileRef, destination: TileRef) {
        self.session = Session::Searching {
            search: self.strategy.begin(map, origin, destination, self.limits),
            origin,
            destination,
        };
    }
}

impl fmt::Debug for PathFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("PathFinder");
        out.field("strategy", &self.strategy);
        match &self.session {
            Session::Idle => out.field("session", &"idle"),
            Session::Searching {
                origin,
                destination,
                ..
            } => out
                .field("session", &"searching")
                .field("origin", origin)
                .field("destination", destination),
            Session::RouteReady {
                route,
                origin,
                destination,
            } => out
                .field("session", &"route_ready")
                .field("origin", origin)
                .field("destination", destination)
                .field("remaining", &route.len()),
        };
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{GridMap, TerrainType};
    use proptest::prelude::*;

    fn water_finder() -> PathFinder {
        PathFinder::new(
            SearchStrategy::Terrain(Traversal::Water),
            SearchLimits::default(),
            RecomputePolicy::default(),
        )
    }

    /// Follow the finder until it stops producing tiles.
    fn follow(
        finder: &mut PathFinder,
        map: &GridMap,
        mut current: TileRef,
        destination: TileRef,
    ) -> (Vec<TileRef>, PathStep) {
        let mut visited = vec![current];
        for _ in 0..10_000 {
            match finder.next_tile(map, current, destination, 1) {
                PathStep::Next(next) => {
                    assert_eq!(map.manhattan_dist(current, next), 1, "non-adjacent step");
                    current = next;
                    visited.push(next);
                }
                PathStep::Pending => {}
                done => return (visited, done),
            }
        }
        panic!("path finder never finished");
    }

    #[test]
    fn test_policy_tolerance_bands() {
        let policy = RecomputePolicy::default();
        assert_eq!(policy.tolerance(51), 10);
        assert_eq!(policy.tolerance(50), 5);
        assert_eq!(policy.tolerance(26), 5);
        assert_eq!(policy.tolerance(25), 0);
        assert_eq!(policy.tolerance(0), 0);
    }

    #[test]
    fn test_open_water_route_is_monotone() {
        let map = GridMap::filled(60, 60, TerrainType::Ocean).unwrap();
        let mut finder = water_finder();
        let destination = map.tile_ref(50, 41);
        let (visited, done) = follow(&mut finder, &map, map.tile_ref(3, 7), destination);

        assert_eq!(done, PathStep::Completed(destination));
        assert_eq!(visited.last(), Some(&destination));
        for pair in visited.windows(2) {
            assert!(
                map.manhattan_dist(pair[1], destination) < map.manhattan_dist(pair[0], destination)
            );
        }
    }

    #[test]
    fn test_route_avoids_land() {
        let map = GridMap::from_ascii(&[
            "~~~~~~~~~~", //
            "~~~~#~~~~~", //
            "~~~~#~~~~~", //
            "~~~~#~~~~~", //
            "~~~~#~~~~~", //
            "~~~~~~~~~~", //
        ])
        .unwrap();
        let mut finder = water_finder();
        let destination = map.tile_ref(8, 3);
        let (visited, done) = follow(&mut finder, &map, map.tile_ref(1, 3), destination);
        assert_eq!(done, PathStep::Completed(destination));
        assert!(visited.iter().all(|&t| map.is_water(t)));
    }

    #[test]
    fn test_small_budget_reports_pending_first() {
        let map = GridMap::filled(80, 80, TerrainType::Ocean).unwrap();
        let mut finder = PathFinder::new(
            SearchStrategy::Terrain(Traversal::Water),
            SearchLimits {
                iterations_per_call: 4,
                max_tries: 1_000,
            },
            RecomputePolicy::default(),
        );
        let start = map.tile_ref(0, 0);
        let destination = map.tile_ref(70, 70);

        assert_eq!(finder.next_tile(&map, start, destination, 1), PathStep::Pending);
        assert!(finder.is_searching());

        let mut calls = 1;
        let first = loop {
            match finder.next_tile(&map, start, destination, 1) {
                PathStep::Pending => calls += 1,
                step => break step,
            }
        };
        assert!(calls > 1);
        assert!(matches!(first, PathStep::Next(_)));
        assert_eq!(finder.route_len(), Some(139));
    }

    #[test]
    fn test_small_drift_keeps_route_large_drift_recomputes() {
        let map = GridMap::filled(120, 20, TerrainType::Ocean).unwrap();
        let mut finder = PathFinder::new(
            SearchStrategy::Terrain(Traversal::Water),
            SearchLimits {
                iterations_per_call: 10,
                max_tries: 1_000,
            },
            RecomputePolicy::default(),
        );
        let mut current = map.tile_ref(5, 10);
        let destination = map.tile_ref(100, 10);
        loop {
            if let PathStep::Next(next) = finder.next_tile(&map, current, destination, 1) {
                current = next;
                break;
            }
        }

        // 94 tiles out, drift of 8 is inside the far tolerance of 10
        let drifted = map.tile_ref(100, 18);
        assert!(matches!(
            finder.next_tile(&map, current, drifted, 1),
            PathStep::Next(_)
        ));
        assert!(!finder.is_searching());

        // drift of 20 forces a fresh search
        let moved = map.tile_ref(80, 10);
        assert_eq!(finder.next_tile(&map, current, moved, 1), PathStep::Pending);
        assert!(finder.is_searching());
    }

    #[test]
    fn test_close_range_recomputes_on_any_drift() {
        let map = GridMap::filled(40, 40, TerrainType::Ocean).unwrap();
        let mut finder = water_finder();
        let current = map.tile_ref(10, 10);
        assert!(matches!(
            finder.next_tile(&map, current, map.tile_ref(20, 10), 1),
            PathStep::Next(_)
        ));
        assert_eq!(finder.route_len(), Some(9));

        // 10 tiles away, one tile of drift is over the near tolerance of 0
        assert!(matches!(
            finder.next_tile(&map, current, map.tile_ref(20, 11), 1),
            PathStep::Next(_)
        ));
        assert_eq!(finder.route_len(), Some(10));
    }

    #[test]
    fn test_unreachable_destination_resets_to_idle() {
        let map = GridMap::from_ascii(&[
            "~~~~~~", //
            "~~###~", //
            "~~#~#~", //
            "~~###~", //
        ])
        .unwrap();
        let mut finder = water_finder();
        let start = map.tile_ref(0, 0);
        let lake = map.tile_ref(3, 2);
        assert_eq!(finder.next_tile(&map, start, lake, 1), PathStep::PathNotFound);
        assert!(!finder.is_searching());
        assert_eq!(finder.route_len(), None);
        // the next call starts over rather than replaying a failed search
        assert_eq!(finder.next_tile(&map, start, lake, 1), PathStep::PathNotFound);
    }

    #[test]
    fn test_coarse_strategy_reaches_destination() {
        let mut map = GridMap::filled(64, 48, TerrainType::Ocean).unwrap();
        for y in 0..40 {
            map.set_terrain(30, y, TerrainType::Plains);
            map.set_terrain(31, y, TerrainType::Plains);
        }
        let mut finder = PathFinder::new(
            SearchStrategy::Coarse(Traversal::Water),
            SearchLimits::default(),
            RecomputePolicy::default(),
        );
        let destination = map.tile_ref(60, 5);
        let (visited, done) = follow(&mut finder, &map, map.tile_ref(2, 5), destination);
        assert_eq!(done, PathStep::Completed(destination));
        assert!(visited.iter().any(|&t| map.y(t) >= 40));
    }

    #[test]
    fn test_debug_names_session() {
        let finder = water_finder();
        assert!(format!("{finder:?}").contains("idle"));
    }

    proptest! {
        /// Within `close_enough` the finder completes on the current tile
        /// without searching.
        #[test]
        fn prop_close_enough_completes(
            x0 in 0u32..50, y0 in 0u32..50,
            x1 in 0u32..50, y1 in 0u32..50,
            slack in 1u32..5,
        ) {
            let map = GridMap::filled(50, 50, TerrainType::Ocean).unwrap();
            let mut finder = water_finder();
            let current = map.tile_ref(x0, y0);
            let destination = map.tile_ref(x1, y1);
            let close_enough = map.manhattan_dist(current, destination) + slack;
            prop_assert_eq!(
                finder.next_tile(&map, current, destination, close_enough),
                PathStep::Completed(current)
            );
            prop_assert!(!finder.is_searching());
        }

        /// Reachable destinations are reached with every step adjacent.
        #[test]
        fn prop_reachable_routes_arrive(
            x0 in 0u32..30, y0 in 0u32..30,
            x1 in 0u32..30, y1 in 0u32..30,
        ) {
            let map = GridMap::filled(30, 30, TerrainType::Ocean).unwrap();
            let mut finder = water_finder();
            let destination = map.tile_ref(x1, y1);
            let (visited, done) = follow(&mut finder, &map, map.tile_ref(x0, y0), destination);
            prop_assert_eq!(done, PathStep::Completed(destination));
            prop_assert_eq!(visited.len() as u32, map.manhattan_dist(map.tile_ref(x0, y0), destination) + 1);
        }
    }
}
