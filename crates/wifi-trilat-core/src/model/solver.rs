//! Closed-form position solver for two or three sensor samples.
//!
//! Two samples give the midpoint of the two sensors; the signals are not
//! used. Three samples are trilaterated by subtracting the circle equations
//! pairwise, which leaves a 2x2 linear system:
//!
//! ```text
//! A x + B y = C      A = 2(x2-x1)  B = 2(y2-y1)  C = r1²-r2²-x1²+x2²-y1²+y2²
//! D x + E y = F      D = 2(x3-x2)  E = 2(y3-y2)  F = r2²-r3²-x2²+x3²-y2²+y3²
//! ```
//!
//! When the determinant is exactly zero (collinear sensors) the centroid of
//! the three sensors is returned. There is one pass per window: no iterative
//! refinement, no confidence weighting and no clamping.

use crate::domain::{Position, Sample};

use super::distance::DistanceModel;

/// Solver bound to one set of distance calibration constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSolver {
    model: DistanceModel,
}

impl PositionSolver {
    /// Create a solver using `model` to turn signals into radii.
    pub fn new(model: DistanceModel) -> Self {
        Self { model }
    }

    /// The distance model in use.
    pub fn model(&self) -> &DistanceModel {
        &self.model
    }

    /// Estimate a device position from a window of samples.
    ///
    /// Returns `None` unless the window holds two or three samples.
    pub fn solve(&self, samples: &[Sample]) -> Option<Position> {
        match samples {
            [a, b] => Some(midpoint(&a.sensor, &b.sensor)),
            [a, b, c] => Some(trilaterate(
                [a.sensor, b.sensor, c.sensor],
                [a, b, c].map(|s| self.model.estimate(s.signal).radius()),
            )),
            _ => None,
        }
    }
}

fn midpoint(p1: &Position, p2: &Position) -> Position {
    Position::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0)
}

fn centroid(points: &[Position; 3]) -> Position {
    Position::new(
        (points[0].x + points[1].x + points[2].x) / 3.0,
        (points[0].y + points[1].y + points[2].y) / 3.0,
    )
}

/// Solve the linearized three-circle system.
pub fn trilaterate(sensors: [Position; 3], radii: [f64; 3]) -> Position {
    let [Position { x: x1, y: y1 }, Position { x: x2, y: y2 }, Position { x: x3, y: y3 }] = sensors;
    let [r1, r2, r3] = radii;

    let a = 2.0 * x2 - 2.0 * x1;
    let b = 2.0 * y2 - 2.0 * y1;
    let c = r1 * r1 - r2 * r2 - x1 * x1 + x2 * x2 - y1 * y1 + y2 * y2;
    let d = 2.0 * x3 - 2.0 * x2;
    let e = 2.0 * y3 - 2.0 * y2;
    let f = r2 * r2 - r3 * r3 - x2 * x2 + x3 * x3 - y2 * y2 + y3 * y3;

    if a * e - b * d != 0.0 {
        Position::new(
            (c * e - f * b) / (e * a - b * d),
            (c * d - a * f) / (b * d - a * e),
        )
    } else {
        centroid(&sensors)
    }
}
