//! Straight-line interception stepping.

use super::MoverStep;
use crate::map::{GameMap, TileRef};
use crate::math::{Fixed, Vec2Fixed};

/// Steps along the straight line between two tiles.
///
/// Stateless: shells and interceptors re-aim at a moving target every
/// tick simply by passing the target's current tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineMover;

impl StraightLineMover {
    /// Advance `speed` tiles from `current` toward `destination`.
    ///
    /// Reports [`MoverStep::Arrived`] instead of overshooting when the
    /// remaining distance is within `speed`. The rounded lattice step is
    /// re-checked: a step that lands on the destination also arrives, and a
    /// step that fails to shrink the remaining distance (possible for
    /// speeds below one tile) is replaced by a single tile along the
    /// dominant axis.
    pub fn next_tile(
        &self,
        map: &dyn GameMap,
        current: TileRef,
        destination: TileRef,
        speed: Fixed,
    ) -> MoverStep {
        if current == destination {
            return MoverStep::Arrived;
        }

        let from = Vec2Fixed::from_ints(i64::from(map.x(current)), i64::from(map.y(current)));
        let to = Vec2Fixed::from_ints(
            i64::from(map.x(destination)),
            i64::from(map.y(destination)),
        );
        let distance = from.distance(to);
        if distance <= speed {
            return MoverStep::Arrived;
        }

        let (nx, ny) = (from + (to - from).scale(speed / distance)).round_to_lattice();
        let mut next = map.clamped_tile_ref(nx, ny);

        let before = map.euclidean_dist_squared(current, destination);
        if map.euclidean_dist_squared(next, destination) >= before {
            next = dominant_axis_step(map, current, destination);
        }

        if next == destination {
            MoverStep::Arrived
        } else {
            MoverStep::Next(next)
        }
    }
}

/// One tile toward the destination along the axis with the larger delta.
fn dominant_axis_step(map: &dyn GameMap, current: TileRef, destination: TileRef) -> TileRef {
    let (x, y) = (i64::from(map.x(current)), i64::from(map.y(current)));
    let dx = i64::from(map.x(destination)) - x;
    let dy = i64::from(map.y(destination)) - y;

    if dx.abs() >= dy.abs() {
        map.clamped_tile_ref(x + dx.signum(), y)
    } else {
        map.clamped_tile_ref(x, y + dy.signum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{GridMap, TerrainType};
    use proptest::prelude::*;

    fn open_map() -> GridMap {
        GridMap::filled(200, 200, TerrainType::Ocean).unwrap()
    }

    #[test]
    fn test_same_tile_arrives() {
        let map = open_map();
        let t = map.tile_ref(5, 5);
        assert_eq!(
            StraightLineMover.next_tile(&map, t, t, Fixed::from_num(3)),
            MoverStep::Arrived
        );
    }

    #[test]
    fn test_within_speed_arrives_without_overshoot() {
        let map = open_map();
        let a = map.tile_ref(10, 10);
        let b = map.tile_ref(13, 14);
        // distance is exactly 5
        assert_eq!(
            StraightLineMover.next_tile(&map, a, b, Fixed::from_num(5)),
            MoverStep::Arrived
        );
        assert_ne!(
            StraightLineMover.next_tile(&map, a, b, Fixed::from_num(4)),
            MoverStep::Arrived
        );
    }

    #[test]
    fn test_axis_aligned_step() {
        let map = open_map();
        let a = map.tile_ref(0, 0);
        let b = map.tile_ref(20, 0);
        assert_eq!(
            StraightLineMover.next_tile(&map, a, b, Fixed::from_num(2)),
            MoverStep::Next(map.tile_ref(2, 0))
        );
    }

    #[test]
    fn test_slow_speed_still_progresses() {
        let map = open_map();
        let a = map.tile_ref(0, 0);
        let b = map.tile_ref(10, 3);
        let step = StraightLineMover.next_tile(&map, a, b, Fixed::from_num(0.25));
        assert_eq!(step, MoverStep::Next(map.tile_ref(1, 0)));
    }

    #[test]
    fn test_repeated_steps_reach_destination() {
        let map = open_map();
        let mut current = map.tile_ref(3, 90);
        let destination = map.tile_ref(170, 12);
        let mut steps = 0;
        while let MoverStep::Next(next) =
            StraightLineMover.next_tile(&map, current, destination, Fixed::from_num(3))
        {
            current = next;
            steps += 1;
            assert!(steps < 200, "mover failed to converge");
        }
        // 184 tiles at speed 3, give or take lattice rounding
        assert!((50..=85).contains(&steps), "unexpected step count {steps}");
    }

    proptest! {
        /// While the destination is farther than one step, every call
        /// strictly shrinks the remaining distance.
        #[test]
        fn prop_each_step_strictly_decreases_distance(
            x0 in 0u32..200, y0 in 0u32..200,
            x1 in 0u32..200, y1 in 0u32..200,
            speed_quarters in 1u32..40,
        ) {
            let map = open_map();
            let current = map.tile_ref(x0, y0);
            let destination = map.tile_ref(x1, y1);
            let speed = Fixed::from_num(speed_quarters) / Fixed::from_num(4);

            match StraightLineMover.next_tile(&map, current, destination, speed) {
                MoverStep::Next(next) => {
                    prop_assert!(
                        map.euclidean_dist_squared(next, destination)
                            < map.euclidean_dist_squared(current, destination)
                    );
                }
                MoverStep::Arrived => {}
            }
        }

        /// Speed at or above the distance always arrives on the first call.
        #[test]
        fn prop_speed_covering_distance_arrives(
            x0 in 0u32..200, y0 in 0u32..200,
            x1 in 0u32..200, y1 in 0u32..200,
        ) {
            let map = open_map();
            let current = map.tile_ref(x0, y0);
            let destination = map.tile_ref(x1, y1);
            let dist = map.manhattan_dist(current, destination) + 1;
            prop_assert_eq!(
                StraightLineMover.next_tile(&map, current, destination, Fixed::from_num(dist)),
                MoverStep::Arrived
            );
        }
    }
}
