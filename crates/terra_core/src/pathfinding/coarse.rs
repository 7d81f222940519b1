//! Half-resolution search for long routes.
//!
//! Searching a grid with a quarter of the cells is much cheaper for
//! cross-map trips. The coarse route is walked back onto the full grid as
//! a chain of 4-connected segments between cell waypoints.

use super::astar::{ResumableAStar, SearchGraph, SearchLimits, SearchStatus};
use super::terrain::Traversal;
use super::BoundedSearch;
use crate::map::{GameMap, TileRef};

/// Fine tiles per coarse cell along each axis.
pub const COARSE_FACTOR: u32 = 2;

type Cell = (u32, u32);

pub(crate) struct CoarseGraph {
    traversal: Traversal,
}

impl CoarseGraph {
    fn dims(map: &dyn GameMap) -> (u32, u32) {
        (
            map.width().div_ceil(COARSE_FACTOR),
            map.height().div_ceil(COARSE_FACTOR),
        )
    }

    fn cell_of(map: &dyn GameMap, tile: TileRef) -> Cell {
        (map.x(tile) / COARSE_FACTOR, map.y(tile) / COARSE_FACTOR)
    }

    /// Fine tiles covered by a cell, row-major, clipped to the map.
    fn fine_tiles(map: &dyn GameMap, (cx, cy): Cell) -> impl Iterator<Item = TileRef> + '_ {
        (0..COARSE_FACTOR).flat_map(move |dy| {
            (0..COARSE_FACTOR).filter_map(move |dx| {
                map.try_tile_ref(
                    i64::from(cx * COARSE_FACTOR + dx),
                    i64::from(cy * COARSE_FACTOR + dy),
                )
            })
        })
    }

    /// Admissible tile of `cell` nearest to `from`, used as a route waypoint.
    ///
    /// Picking the nearest tile keeps the upscaled route monotone wherever
    /// the coarse route is.
    fn waypoint(&self, map: &dyn GameMap, cell: Cell, from: TileRef) -> TileRef {
        let nearest = |admissible_only: bool| {
            Self::fine_tiles(map, cell)
                .filter(|&t| !admissible_only || self.traversal.admits(map.terrain(t)))
                .min_by_key(|&t| (map.manhattan_dist(from, t), t))
        };
        nearest(true).or_else(|| nearest(false)).unwrap_or(from)
    }
}

impl SearchGraph for CoarseGraph {
    type Node = Cell;

    fn neighbors(&self, map: &dyn GameMap, (cx, cy): Cell, out: &mut Vec<Cell>) {
        let (w, h) = Self::dims(map);
        if cx + 1 < w {
            out.push((cx + 1, cy));
        }
        if cy + 1 < h {
            out.push((cx, cy + 1));
        }
        if cx > 0 {
            out.push((cx - 1, cy));
        }
        if cy > 0 {
            out.push((cx, cy - 1));
        }
    }

    fn entry_cost(&self, map: &dyn GameMap, cell: Cell) -> Option<u32> {
        Self::fine_tiles(map, cell)
            .any(|t| self.traversal.admits(map.terrain(t)))
            .then_some(1)
    }

    fn heuristic(&self, _map: &dyn GameMap, from: Cell, to: Cell) -> u32 {
        from.0.abs_diff(to.0) + from.1.abs_diff(to.1)
    }
}

/// A* over a grid at `1 / COARSE_FACTOR` resolution.
///
/// A coarse cell is passable if any of its fine tiles is. The upscaled
/// route starts on the origin and ends on the destination but is only as
/// terrain-accurate as the coarse grid.
pub struct CoarseSearch {
    astar: ResumableAStar<CoarseGraph>,
    origin: TileRef,
    destination: TileRef,
}

impl CoarseSearch {
    /// Start a search. No cells are expanded until the first step.
    #[must_use]
    pub fn new(
        map: &dyn GameMap,
        traversal: Traversal,
        origin: TileRef,
        destination: TileRef,
        limits: SearchLimits,
    ) -> Self {
        let graph = CoarseGraph { traversal };
        let start = CoarseGraph::cell_of(map, origin);
        let goal = CoarseGraph::cell_of(map, destination);
        Self {
            astar: ResumableAStar::new(graph, map, start, goal, limits),
            origin,
            destination,
        }
    }
}

impl BoundedSearch for CoarseSearch {
    fn step(&mut self, map: &dyn GameMap) -> SearchStatus {
        self.astar.step(map)
    }

    fn path(&self, map: &dyn GameMap) -> Vec<TileRef> {
        let cells = self.astar.reconstruct_path();
        if cells.is_empty() {
            return Vec::new();
        }

        let mut route = vec![self.origin];
        // The first cell holds the origin and the last the destination.
        let interior = cells.get(1..cells.len() - 1).unwrap_or(&[]);
        for &cell in interior {
            let from = route.last().copied().unwrap_or(self.origin);
            let waypoint = self.astar.graph().waypoint(map, cell, from);
            walk_segment(map, &mut route, waypoint);
        }
        walk_segment(map, &mut route, self.destination);
        route
    }
}

/// Extend `route` one orthogonal tile at a time up to `target`.
fn walk_segment(map: &dyn GameMap, route: &mut Vec<TileRef>, target: TileRef) {
    let Some(&start) = route.last() else {
        return;
    };
    let (mut x, mut y) = (i64::from(map.x(start)), i64::from(map.y(start)));
    let (tx, ty) = (i64::from(map.x(target)), i64::from(map.y(target)));

    while (x, y) != (tx, ty) {
        let (dx, dy) = (tx - x, ty - y);
        if dx.abs() >= dy.abs() {
            x += dx.signum();
        } else {
            y += dy.signum();
        }
        route.push(map.clamped_tile_ref(x, y));
    }
}
