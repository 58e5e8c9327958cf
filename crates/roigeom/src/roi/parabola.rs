//! Parabolic region of interest (open curve).

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::orient::Orientation;
use crate::roi::Roi;

/// A parabola in focal polar form, `r = 2p / (1 − cos θ)`, anchored at its
/// focus and rotated by the orientation angle.
///
/// Open curve: bounds are the unbounded sentinel and containment is always
/// false. Outline proximity tests the implicit-equation residual in the
/// rotated frame, which is an algebraic (not Euclidean) distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParabolaRoi {
    focus: [f64; 2],
    focal_parameter: f64,
    orient: Orientation,
    #[serde(skip)]
    cache: BoundsCache,
}

impl ParabolaRoi {
    /// Parabola from focus, focal parameter `p` and rotation angle.
    pub fn new(focus: [f64; 2], focal_parameter: f64, angle: f64) -> Self {
        Self {
            focus,
            focal_parameter,
            orient: Orientation::new(angle),
            cache: BoundsCache::new(),
        }
    }

    /// Focus point.
    pub fn focus(&self) -> [f64; 2] {
        self.focus
    }

    /// Focal parameter `p`.
    pub fn focal_parameter(&self) -> f64 {
        self.focal_parameter
    }

    /// Set the focal parameter.
    pub fn set_focal_parameter(&mut self, p: f64) {
        self.focal_parameter = p;
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
    /// At `cos θ = 1` the radius diverges; the result carries a signed
    /// infinity in each coordinate whose ray-direction component is nonzero
    /// (the focus coordinate where it is zero).
    pub fn point_at_angle(&self, theta: f64) -> [f64; 2] {
        let denom = 1.0 - theta.cos();
        let dir = self.orient.to_global([theta.cos(), theta.sin()]);
        if denom == 0.0 {
            return point_at_infinity(self.focus, dir);
        }
        let r = 2.0 * self.focal_parameter / denom;
        [self.focus[0] + r * dir[0], self.focus[1] + r * dir[1]]
    }

    /// Sample `n` points over the polar-angle interval `(lo, hi)`.
    pub fn sample_points(&self, lo: f64, hi: f64, n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| self.point_at_angle(lo + (hi - lo) * (i as f64 + 0.5) / n as f64))
            .collect()
    }
}

/// Limit point of a ray that escapes to infinity: signed infinity per
/// component of the direction, the anchor coordinate where the component
/// vanishes (avoids `∞ · 0`).
pub(crate) fn point_at_infinity(anchor: [f64; 2], dir: [f64; 2]) -> [f64; 2] {
    let coord = |a: f64, d: f64| {
        if d == 0.0 {
            a
        } else {
            d.signum() * f64::INFINITY
        }
    };
    [coord(anchor[0], dir[0]), coord(anchor[1], dir[1])]
}

impl Default for ParabolaRoi {
    fn default() -> Self {
        Self::new([0.0, 0.0], 1.0, 0.0)
    }
}

impl Roi for ParabolaRoi {
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

    /// Implicit-equation residual `|y'² − 4p(x' + p)|` in the rotated frame.
    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        let local = self
            .orient
            .to_local([x - self.focus[0], y - self.focus[1]]);
        let p = self.focal_parameter;
        (local[1] * local[1] - 4.0 * p * (local[0] + p)).abs() <= distance
    }

    fn downsample(&mut self, factor: f64) {
        self.focus[0] /= factor;
        self.focus[1] /= factor;
        self.focal_parameter /= factor;
        self.cache.invalidate();
    }
}
