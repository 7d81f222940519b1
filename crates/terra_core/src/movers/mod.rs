//! Kinematic movers.
//!
//! Each mover answers one question: given where an agent is and where it
//! is going, which tile does it occupy after one tick? Movers never touch
//! world state; the calling execution applies the returned step.

mod air;
mod parabola;
mod straight;

pub use air::AirMover;
pub use parabola::{ParabolaMover, PARABOLA_MIN_HEIGHT};
pub use straight::StraightLineMover;

use crate::map::TileRef;

/// Result of advancing a mover by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverStep {
    /// Move to this tile and keep going.
    Next(TileRef),
    /// The destination has been reached; the caller snaps onto it.
    Arrived,
}
