//! Fixed-point geometry for movers.
//!
//! Projectile and missile trajectories are computed in fixed point so
//! every peer lands on the same tiles. Floats are never used in the
//! simulation.

use std::ops::{Add, Sub};

use fixed::types::{I32F32, I64F64};

/// Fixed-point scalar: 32 integer bits, 32 fractional bits.
pub type Fixed = I32F32;

/// Wide scalar for squared lengths, which overflow [`Fixed`] once a
/// component delta passes 46340.
pub type WideFixed = I64F64;

/// A point or displacement on the tile lattice, in fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vec2Fixed {
    /// Column.
    pub x: Fixed,
    /// Row.
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Build from fixed-point components.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Build from lattice coordinates.
    #[must_use]
    pub fn from_ints(x: i64, y: i64) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Squared Euclidean distance, computed in [`WideFixed`].
    #[must_use]
    pub fn distance_squared(self, other: Self) -> WideFixed {
        let (dx, dy) = (
            WideFixed::from_num(self.x) - WideFixed::from_num(other.x),
            WideFixed::from_num(self.y) - WideFixed::from_num(other.y),
        );
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Both components multiplied by `factor`.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Point at `t` along the segment from `self` to `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self + (other - self).scale(t)
    }

    /// Nearest lattice coordinates, rounding halves away from zero.
    #[must_use]
    pub fn round_to_lattice(self) -> (i64, i64) {
        (self.x.round().to_num(), self.y.round().to_num())
    }
}

impl Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Square root by bisection, narrowed back to [`Fixed`]. Non-positive
/// input yields zero.
#[must_use]
pub fn fixed_sqrt(value: WideFixed) -> Fixed {
    if value <= WideFixed::ZERO {
        return Fixed::ZERO;
    }
    // the root of anything below 2^63 is below 2^32
    let ceiling = WideFixed::from_num(1u64 << 32);
    let (mut lo, mut hi) = (WideFixed::ZERO, value.max(WideFixed::ONE).min(ceiling));
    // 64 halvings of at most 2^32 reach the 2^-32 resolution of Fixed.
    for _ in 0..64 {
        let mid = lo + (hi - lo) / 2;
        if mid.saturating_mul(mid) <= value {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Fixed::saturating_from_num(lo)
}
