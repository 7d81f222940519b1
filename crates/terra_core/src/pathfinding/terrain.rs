//! Full-resolution, terrain-aware search.

use serde::{Deserialize, Serialize};

use super::astar::{ResumableAStar, SearchGraph, SearchLimits, SearchStatus};
use super::BoundedSearch;
use crate::map::{GameMap, TerrainType, TileRef};

/// Which tiles a search may enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Traversal {
    /// Ocean and lakes, uniform cost.
    Water,
    /// Land, weighted by elevation.
    Land,
}

impl Traversal {
    /// Movement cost of entering a tile, `None` if it cannot be entered.
    #[must_use]
    pub const fn cost(self, terrain: TerrainType) -> Option<u32> {
        match (self, terrain) {
            (Self::Water, TerrainType::Ocean | TerrainType::Lake) => Some(1),
            (Self::Land, TerrainType::Plains) => Some(1),
            (Self::Land, TerrainType::Highland) => Some(2),
            (Self::Land, TerrainType::Mountain) => Some(3),
            _ => None,
        }
    }

    /// Returns true if the terrain can be entered.
    #[must_use]
    pub const fn admits(self, terrain: TerrainType) -> bool {
        self.cost(terrain).is_some()
    }
}

pub(crate) struct TerrainGraph {
    traversal: Traversal,
}

impl SearchGraph for TerrainGraph {
    type Node = TileRef;

    fn neighbors(&self, map: &dyn GameMap, node: TileRef, out: &mut Vec<TileRef>) {
        out.extend(map.neighbors(node));
    }

    fn entry_cost(&self, map: &dyn GameMap, node: TileRef) -> Option<u32> {
        self.traversal.cost(map.terrain(node))
    }

    fn heuristic(&self, map: &dyn GameMap, from: TileRef, to: TileRef) -> u32 {
        map.manhattan_dist(from, to)
    }
}

/// A* over 4-neighbour tiles restricted to one [`Traversal`] domain.
///
/// The start tile is never checked and the goal tile is always
/// admissible, so a ship can path onto the shore tile it is landing on.
pub struct TerrainSearch {
    astar: ResumableAStar<TerrainGraph>,
}

impl TerrainSearch {
    /// Start a search. No nodes are expanded until the first step.
    #[must_use]
    pub fn new(
        map: &dyn GameMap,
        traversal: Traversal,
        origin: TileRef,
        destination: TileRef,
        limits: SearchLimits,
    ) -> Self {
        Self {
            astar: ResumableAStar::new(
                TerrainGraph { traversal },
                map,
                origin,
                destination,
                limits,
            ),
        }
    }

    /// The traversal domain this search is restricted to.
    #[must_use]
    pub fn traversal(&self) -> Traversal {
        self.astar.graph().traversal
    }
}

impl BoundedSearch for TerrainSearch {
    fn step(&mut self, map: &dyn GameMap) -> SearchStatus {
        self.astar.step(map)
    }

    fn path(&self, _map: &dyn GameMap) -> Vec<TileRef> {
        self.astar.reconstruct_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GridMap;

    fn run(search: &mut TerrainSearch, map: &GridMap) -> SearchStatus {
        loop {
            match search.step(map) {
                SearchStatus::Pending => continue,
                status => return status,
            }
        }
    }

    #[test]
    fn test_traversal_costs() {
        assert_eq!(Traversal::Water.cost(TerrainType::Lake), Some(1));
        assert_eq!(Traversal::Water.cost(TerrainType::Plains), None);
        assert_eq!(Traversal::Land.cost(TerrainType::Mountain), Some(3));
        assert!(!Traversal::Land.admits(TerrainType::Ocean));
    }

    #[test]
    fn test_straight_water_path() {
        let map = GridMap::from_ascii(&["~~~~~~"]).unwrap();
        let mut search = TerrainSearch::new(
            &map,
            Traversal::Water,
            map.tile_ref(0, 0),
            map.tile_ref(5, 0),
            SearchLimits::default(),
        );
        assert_eq!(run(&mut search, &map), SearchStatus::Completed);
        let path = search.path(&map);
        assert_eq!(path.len(), 6);
        assert_eq!(path.first(), Some(&map.tile_ref(0, 0)));
        assert_eq!(path.last(), Some(&map.tile_ref(5, 0)));
    }

    #[test]
    fn test_path_around_island() {
        let map = GridMap::from_ascii(&[
            "~~~~~~~", //
            "~~~#~~~", //
            "~~~#~~~", //
            "~~~#~~~", //
            "~~~~~~~", //
        ])
        .unwrap();
        let mut search = TerrainSearch::new(
            &map,
            Traversal::Water,
            map.tile_ref(1, 2),
            map.tile_ref(5, 2),
            SearchLimits::default(),
        );
        assert_eq!(run(&mut search, &map), SearchStatus::Completed);
        let path = search.path(&map);
        assert!(path.iter().all(|&t| map.is_water(t)));
        for pair in path.windows(2) {
            assert_eq!(map.manhattan_dist(pair[0], pair[1]), 1);
        }
        // around the 3-tile wall: 4 across plus 2 up and 2 down
        assert_eq!(path.len(), 9);
    }

    #[test]
    fn test_shore_goal_is_admissible() {
        let map = GridMap::from_ascii(&["~~~##"]).unwrap();
        let mut search = TerrainSearch::new(
            &map,
            Traversal::Water,
            map.tile_ref(0, 0),
            map.tile_ref(3, 0),
            SearchLimits::default(),
        );
        assert_eq!(run(&mut search, &map), SearchStatus::Completed);
        assert_eq!(search.path(&map).last(), Some(&map.tile_ref(3, 0)));
    }

    #[test]
    fn test_enclosed_goal_not_found() {
        let map = GridMap::from_ascii(&[
            "~~~~~", //
            "~###~", //
            "~#~#~", //
            "~###~", //
        ])
        .unwrap();
        let mut search = TerrainSearch::new(
            &map,
            Traversal::Water,
            map.tile_ref(0, 0),
            map.tile_ref(2, 2),
            SearchLimits::default(),
        );
        assert_eq!(run(&mut search, &map), SearchStatus::PathNotFound);
        assert!(search.path(&map).is_empty());
    }

    #[test]
    fn test_land_prefers_cheap_terrain() {
        let map = GridMap::from_ascii(&[
            "#^^^#", //
            "#####", //
        ])
        .unwrap();
        let mut search = TerrainSearch::new(
            &map,
            Traversal::Land,
            map.tile_ref(0, 0),
            map.tile_ref(4, 0),
            SearchLimits::default(),
        );
        assert_eq!(run(&mut search, &map), SearchStatus::Completed);
        let path = search.path(&map);
        assert!(path
            .iter()
            .all(|&t| map.terrain(t) != TerrainType::Mountain));
    }

    #[test]
    fn test_budget_exhaustion_gives_up() {
        let map = GridMap::filled(64, 64, TerrainType::Ocean).unwrap();
        let limits = SearchLimits {
            iterations_per_call: 1,
            max_tries: 3,
        };
        let mut search = TerrainSearch::new(
            &map,
            Traversal::Water,
            map.tile_ref(0, 0),
            map.tile_ref(63, 63),
            limits,
        );
        assert_eq!(search.step(&map), SearchStatus::Pending);
        assert_eq!(search.step(&map), SearchStatus::Pending);
        assert_eq!(search.step(&map), SearchStatus::PathNotFound);
        // terminal status is sticky
        assert_eq!(search.step(&map), SearchStatus::PathNotFound);
    }

    #[test]
    fn test_deterministic_paths() {
        let map = GridMap::filled(30, 30, TerrainType::Ocean).unwrap();
        let find = || {
            let mut search = TerrainSearch::new(
                &map,
                Traversal::Water,
                map.tile_ref(2, 3),
                map.tile_ref(27, 21),
                SearchLimits::default(),
            );
            run(&mut search, &map);
            search.path(&map)
        };
        assert_eq!(find(), find());
    }
}
