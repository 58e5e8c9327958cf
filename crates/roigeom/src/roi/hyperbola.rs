//! Hyperbolic region of interest (open curve).

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::orient::Orientation;
use crate::roi::parabola::point_at_infinity;
use crate::roi::Roi;

/// A hyperbola in focal polar form, `r = l / (1 − e·cos θ)` with
/// eccentricity `e > 1` and semi-latus rectum `l`, anchored at one focus and
/// rotated by the orientation angle.
///
/// Where the denominator is negative the signed radius places the point on
/// the far branch. Open curve: unbounded sentinel bounds, no interior,
/// algebraic-residual outline test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperbolaRoi {
    focus: [f64; 2],
    semi_latus: f64,
    eccentricity: f64,
    orient: Orientation,
    #[serde(skip)]
    cache: BoundsCache,
}

impl HyperbolaRoi {
    /// Hyperbola from focus, semi-latus rectum, eccentricity and angle.
    pub fn new(focus: [f64; 2], semi_latus: f64, eccentricity: f64, angle: f64) -> Self {
        Self {
            focus,
            semi_latus,
            eccentricity,
            orient: Orientation::new(angle),
            cache: BoundsCache::new(),
        }
    }

    /// Focus point.
    pub fn focus(&self) -> [f64; 2] {
        self.focus
    }

    /// Semi-latus rectum `l`.
    pub fn semi_latus(&self) -> f64 {
        self.semi_latus
    }

    /// Set the semi-latus rectum.
    pub fn set_semi_latus(&mut self, l: f64) {
        self.semi_latus = l;
        self.cache.invalidate();
    }

    /// Eccentricity `e`.
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Set the eccentricity.
    pub fn set_eccentricity(&mut self, e: f64) {
        self.eccentricity = e;
        self.cache.invalidate();
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.orient.angle()
    }

    /// Rotation angle in degrees.
    pub fn angle_degrees(&self) -> f64 {
        self.orient.angle_degrees()
    }

    /// Set the rotation angle in radians.
    pub fn set_angle(&mut self, angle: f64) {
        self.orient.set_angle(angle);
        self.cache.invalidate();
    }

    /// Set the rotation angle in degrees.
    pub fn set_angle_degrees(&mut self, degrees: f64) {
        self.set_angle(degrees.to_radians());
    }

    /// Point on the curve at polar angle `theta` about the focus.
    ///
    /// `1 − e·cos θ = 0` (asymptote direction) yields the signed-infinity
    /// limit point; a negative denominator yields a negative radius and a
    /// far-branch point.
    pub fn point_at_angle(&self, theta: f64) -> [f64; 2] {
        let denom = 1.0 - self.eccentricity * theta.cos();
        let dir = self.orient.to_global([theta.cos(), theta.sin()]);
        if denom == 0.0 {
            return point_at_infinity(self.focus, dir);
        }
        let r = self.semi_latus / denom;
        [self.focus[0] + r * dir[0], self.focus[1] + r * dir[1]]
    }

    /// Sample `n` points over the polar-angle interval `(lo, hi)`.
    pub fn sample_points(&self, lo: f64, hi: f64, n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| self.point_at_angle(lo + (hi - lo) * (i as f64 + 0.5) / n as f64))
            .collect()
    }
}

impl Default for HyperbolaRoi {
    fn default() -> Self {
        Self::new([0.0, 0.0], 1.0, 2.0, 0.0)
    }
}

impl Roi for HyperbolaRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.focus
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        self.focus = p;
        self.cache.invalidate();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.focus[0] += dx;
        self.focus[1] += dy;
        self.cache.invalidate();
    }

    /// Open curve: the whole plane.
    fn bounds(&self) -> RectBounds {
        self.cache.get_or_compute(RectBounds::unbounded)
    }

    /// Open curves have no interior here.
    fn contains_point(&self, _x: f64, _y: f64) -> bool {
        false
    }

    /// Implicit-equation residual `|(l + e·x')² − x'² − y'²|` in the rotated
    /// frame.
    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        let local = self
            .orient
            .to_local([x - self.focus[0], y - self.focus[1]]);
        let lhs = self.semi_latus + self.eccentricity * local[0];
        (lhs * lhs - local[0] * local[0] - local[1] * local[1]).abs() <= distance
    }

    fn downsample(&mut self, factor: f64) {
        self.focus[0] /= factor;
        self.focus[1] /= factor;
        self.semi_latus /= factor;
        self.cache.invalidate();
    }
}
