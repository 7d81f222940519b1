//! Randomized one-axis-at-a-time walk for aircraft.

use rand::Rng;

use super::MoverStep;
use crate::map::{GameMap, TileRef};

/// Terrain-free mover that still looks organic.
///
/// Each call moves exactly one tile on one axis. The x axis is taken with
/// probability `1 / ratio` where `ratio = floor(1 + |dy| / (|dx| + 1))`,
/// so the axis with the larger remaining delta is favoured without the
/// walk ever becoming a straight staircase.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirMover;

impl AirMover {
    /// Take one randomized step from `current` toward `destination`.
    ///
    /// Arrives when already on the destination, when the step lands on
    /// it, or when the chosen step would not move at all.
    pub fn next_tile<R: Rng + ?Sized>(
        &self,
        map: &dyn GameMap,
        rng: &mut R,
        current: TileRef,
        destination: TileRef,
    ) -> MoverStep {
        if current == destination {
            return MoverStep::Arrived;
        }

        let (x, y) = (i64::from(map.x(current)), i64::from(map.y(current)));
        let (dst_x, dst_y) = (i64::from(map.x(destination)), i64::from(map.y(destination)));
        let (dx, dy) = (dst_x - x, dst_y - y);

        let ratio = 1 + dy.unsigned_abs() / (dx.unsigned_abs() + 1);
        let (next_x, next_y) = if dx != 0 && rng.gen_range(0..ratio) == 0 {
            (x + dx.signum(), y)
        } else {
            (x, y + dy.signum())
        };

        if (next_x, next_y) == (x, y) || (next_x, next_y) == (dst_x, dst_y) {
            return MoverStep::Arrived;
        }

        MoverStep::Next(map.clamped_tile_ref(next_x, next_y))
    }
}
