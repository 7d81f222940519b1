//! Ballistic arcs sampled along a cubic Bezier curve.

use super::MoverStep;
use crate::map::{GameMap, TileRef};
use crate::math::{Fixed, Vec2Fixed};

/// Minimum apex height (in tiles) of an arcing trajectory.
///
/// A geometry constant, not a balance value: short-range launches still
/// get a visible arc.
pub const PARABOLA_MIN_HEIGHT: i64 = 50;

/// Upper bound on lookup-table samples per curve.
const MAX_SAMPLES: usize = 2048;

/// Lower bound on lookup-table samples per curve.
const MIN_SAMPLES: usize = 8;

/// Moves a payload along a precomputed arc at constant ground speed.
///
/// Must be primed with [`compute_control_points`](Self::compute_control_points)
/// before the first [`next_tile`](Self::next_tile).
#[derive(Debug, Clone, Default)]
pub struct ParabolaMover {
    curve: Option<ArcLengthCurve>,
}

impl ParabolaMover {
    /// Create an unprimed mover.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether control points have been computed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.curve.is_some()
    }

    /// Build the curve from `origin` to `destination`.
    ///
    /// The interior control points sit at a quarter and three quarters of
    /// the chord, lifted toward y = 0 by `max(distance / 3, 50)` tiles
    /// (clamped at the map edge). With `distance_based_height` off the
    /// curve is flat. `resolution` is the approximate arc length between
    /// lookup-table samples.
    pub fn compute_control_points(
        &mut self,
        map: &dyn GameMap,
        origin: TileRef,
        destination: TileRef,
        resolution: Fixed,
        distance_based_height: bool,
    ) {
        let p0 = Vec2Fixed::from_ints(i64::from(map.x(origin)), i64::from(map.y(origin)));
        let p3 = Vec2Fixed::from_ints(
            i64::from(map.x(destination)),
            i64::from(map.y(destination)),
        );

        let height = if distance_based_height {
            let third = p0.distance(p3) / Fixed::from_num(3);
            third.max(Fixed::from_num(PARABOLA_MIN_HEIGHT))
        } else {
            Fixed::ZERO
        };

        let chord = p3 - p0;
        let lift = |fraction: Fixed| {
            let on_chord = p0 + chord.scale(fraction);
            Vec2Fixed::new(on_chord.x, (on_chord.y - height).max(Fixed::ZERO))
        };
        let p1 = lift(Fixed::from_num(0.25));
        let p2 = lift(Fixed::from_num(0.75));

        self.curve = Some(ArcLengthCurve::new([p0, p1, p2, p3], resolution));
    }

    /// Advance `speed` tiles of arc length.
    ///
    /// # Panics
    ///
    /// Panics if the control points were never computed.
    pub fn next_tile(&mut self, map: &dyn GameMap, speed: Fixed) -> MoverStep {
        let Some(curve) = self.curve.as_mut() else {
            panic!("ParabolaMover::next_tile called before compute_control_points");
        };

        match curve.advance(speed) {
            Some(point) => {
                let (x, y) = point.round_to_lattice();
                MoverStep::Next(map.clamped_tile_ref(x, y))
            }
            None => MoverStep::Arrived,
        }
    }

    /// Total arc length of the primed curve.
    #[must_use]
    pub fn arc_length(&self) -> Option<Fixed> {
        self.curve.as_ref().map(ArcLengthCurve::total_length)
    }
}

/// Cubic Bezier curve re-parameterized by travelled distance.
#[derive(Debug, Clone)]
struct ArcLengthCurve {
    /// Sampled points, first is the origin, last is the destination.
    points: Vec<Vec2Fixed>,
    /// Cumulative arc length at each sample.
    cumulative: Vec<Fixed>,
    travelled: Fixed,
}

impl ArcLengthCurve {
    fn new(control: [Vec2Fixed; 4], resolution: Fixed) -> Self {
        let polygon = control[0].distance(control[1])
            + control[1].distance(control[2])
            + control[2].distance(control[3]);
        let resolution = resolution.max(Fixed::ONE / Fixed::from_num(4));
        let samples = (polygon / resolution)
            .ceil()
            .to_num::<usize>()
            .clamp(MIN_SAMPLES, MAX_SAMPLES);

        let mut points = Vec::with_capacity(samples + 1);
        let mut cumulative = Vec::with_capacity(samples + 1);
        let step = Fixed::ONE / Fixed::from_num(samples);

        let mut length = Fixed::ZERO;
        for i in 0..=samples {
            let t = if i == samples {
                Fixed::ONE
            } else {
                step * Fixed::from_num(i)
            };
            let point = cubic_bezier(&control, t);
            if let Some(&previous) = points.last() {
                length += point.distance(previous);
            }
            points.push(point);
            cumulative.push(length);
        }

        Self {
            points,
            cumulative,
            travelled: Fixed::ZERO,
        }
    }

    fn total_length(&self) -> Fixed {
        self.cumulative.last().copied().unwrap_or(Fixed::ZERO)
    }

    /// Move along the curve; `None` once the end has been reached.
    fn advance(&mut self, distance: Fixed) -> Option<Vec2Fixed> {
        self.travelled += distance;
        if self.travelled >= self.total_length() {
            return None;
        }

        let upper = self
            .cumulative
            .partition_point(|&c| c <= self.travelled)
            .min(self.points.len() - 1);
        let lower = upper.saturating_sub(1);

        let span = self.cumulative[upper] - self.cumulative[lower];
        if span == Fixed::ZERO {
            return Some(self.points[upper]);
        }
        let fraction = (self.travelled - self.cumulative[lower]) / span;
        Some(self.points[lower].lerp(self.points[upper], fraction))
    }
}

/// Evaluate a cubic Bezier curve at `t` in [0, 1].
fn cubic_bezier(control: &[Vec2Fixed; 4], t: Fixed) -> Vec2Fixed {
    let three = Fixed::from_num(3);
    let u = Fixed::ONE - t;
    let b0 = u * u * u;
    let b1 = three * u * u * t;
    let b2 = three * u * t * t;
    let b3 = t * t * t;

    Vec2Fixed::new(
        control[0].x * b0 + control[1].x * b1 + control[2].x * b2 + control[3].x * b3,
        control[0].y * b0 + control[1].y * b1 + control[2].y * b2 + control[3].y * b3,
    )
}
