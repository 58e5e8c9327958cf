//! Rotated ellipse region of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::orient::Orientation;
use crate::roi::{CircleRoi, Roi, RoiError};

/// An ellipse described by centre, semi-axes and rotation angle.
///
/// The parametric angle runs over the unrotated frame; boundary points are
/// `centre + R(φ) · (a·cosθ, b·sinθ)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EllipseRoi {
    center: [f64; 2],
    semi_axes: [f64; 2],
    orient: Orientation,
    #[serde(skip)]
    cache: BoundsCache,
}

impl EllipseRoi {
    /// Ellipse at `center` with semi-axes `a`, `b` and rotation `angle`.
    pub fn new(center: [f64; 2], a: f64, b: f64, angle: f64) -> Self {
        Self {
            center,
            semi_axes: [a, b],
            orient: Orientation::new(angle),
            cache: BoundsCache::new(),
        }
    }

    /// Centre.
    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Move the centre.
    pub fn set_center(&mut self, center: [f64; 2]) {
        self.center = center;
        self.cache.invalidate();
    }

    /// Semi-axes `[a, b]`.
    pub fn semi_axes(&self) -> [f64; 2] {
        self.semi_axes
    }

    /// Set both semi-axes.
    pub fn set_semi_axes(&mut self, a: f64, b: f64) {
        self.semi_axes = [a, b];
        self.cache.invalidate();
    }

    /// Set one semi-axis by index (0 = a, 1 = b).
    pub fn set_semi_axis(&mut self, axis: usize, value: f64) -> Result<(), RoiError> {
        let slot = self
            .semi_axes
            .get_mut(axis)
            .ok_or(RoiError::InvalidIndex { index: axis, len: 2 })?;
        *slot = value;
        self.cache.invalidate();
        Ok(())
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

    /// Centre-relative boundary point at parametric angle `theta`.
    fn relative_point(&self, theta: f64) -> [f64; 2] {
        let (ct, st) = (theta.cos(), theta.sin());
        let [a, b] = self.semi_axes;
        let (cp, sp) = (self.orient.cos(), self.orient.sin());
        [a * cp * ct - b * sp * st, a * sp * ct + b * cp * st]
    }

    /// Boundary point at parametric angle `theta` (radians).
    pub fn point_at_angle(&self, theta: f64) -> [f64; 2] {
        let r = self.relative_point(theta);
        [self.center[0] + r[0], self.center[1] + r[1]]
    }

    /// Distance from the centre to the boundary at parametric angle `theta`.
    pub fn distance_at_angle(&self, theta: f64) -> f64 {
        let r = self.relative_point(theta);
        r[0].hypot(r[1])
    }

    /// Sample `n` evenly spaced boundary points.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| self.point_at_angle(std::f64::consts::TAU * i as f64 / n as f64))
            .collect()
    }

    /// Parametric angle whose boundary point lies on the ray through the
    /// centre-relative point `(x, y)`.
    fn parametric_angle_of(&self, x: f64, y: f64) -> f64 {
        let [a, b] = self.semi_axes;
        let (cp, sp) = (self.orient.cos(), self.orient.sin());
        (a * (cp * y - sp * x)).atan2(b * (cp * x + sp * y))
    }

    fn compute_bounds(&self) -> RectBounds {
        // Stationary points of x(θ) and y(θ), plus antipodes: four samples.
        let [a, b] = self.semi_axes;
        let (cp, sp) = (self.orient.cos(), self.orient.sin());
        let tx = (-b * sp).atan2(a * cp);
        let ty = (b * cp).atan2(a * sp);

        let mut bounds = RectBounds::at_point(self.point_at_angle(tx));
        for theta in [
            tx + std::f64::consts::PI,
            ty,
            ty + std::f64::consts::PI,
        ] {
            bounds.include_point(self.point_at_angle(theta));
        }
        bounds
    }
}

impl Default for EllipseRoi {
    fn default() -> Self {
        Self::new([0.0, 0.0], 1.0, 1.0, 0.0)
    }
}

impl From<&CircleRoi> for EllipseRoi {
    fn from(c: &CircleRoi) -> Self {
        Self::new(c.center(), c.radius(), c.radius(), 0.0)
    }
}

impl Roi for EllipseRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.center
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        self.set_center(p);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.center[0] += dx;
        self.center[1] += dy;
        self.cache.invalidate();
    }

    fn bounds(&self) -> RectBounds {
        self.cache.get_or_compute(|| self.compute_bounds())
    }

    /// Radial comparison against the boundary distance at the matching
    /// parametric angle.
    fn contains_point(&self, x: f64, y: f64) -> bool {
        let rx = x - self.center[0];
        let ry = y - self.center[1];
        let theta = self.parametric_angle_of(rx, ry);
        rx.hypot(ry) <= self.distance_at_angle(theta)
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        let rx = x - self.center[0];
        let ry = y - self.center[1];
        let theta = self.parametric_angle_of(rx, ry);
        (rx.hypot(ry) - self.distance_at_angle(theta)).abs() <= distance
    }

    fn downsample(&mut self, factor: f64) {
        self.center[0] /= factor;
        self.center[1] /= factor;
        self.semi_axes[0] /= factor;
        self.semi_axes[1] /= factor;
        self.cache.invalidate();
    }
}
