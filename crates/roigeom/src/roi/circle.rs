//! Circular region of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::roi::Roi;

/// A circle described by centre and radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleRoi {
    center: [f64; 2],
    radius: f64,
    #[serde(skip)]
    cache: BoundsCache,
}

impl CircleRoi {
    /// Circle at `center` with the given radius.
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Self {
            center,
            radius,
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

    /// Radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Set the radius.
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.cache.invalidate();
    }

    /// Point on the circle at parametric angle `theta` (radians).
    pub fn point_at_angle(&self, theta: f64) -> [f64; 2] {
        [
            self.center[0] + self.radius * theta.cos(),
            self.center[1] + self.radius * theta.sin(),
        ]
    }

    /// Sample `n` evenly spaced boundary points.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| self.point_at_angle(std::f64::consts::TAU * i as f64 / n as f64))
            .collect()
    }

    fn radial_distance(&self, x: f64, y: f64) -> f64 {
        (x - self.center[0]).hypot(y - self.center[1])
    }
}

impl Default for CircleRoi {
    fn default() -> Self {
        Self::new([0.0, 0.0], 1.0)
    }
}

impl Roi for CircleRoi {
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

    /// Square of side `2r` centred on the circle.
    fn bounds(&self) -> RectBounds {
        self.cache.get_or_compute(|| {
            RectBounds::new(
                self.center[0] - self.radius,
                self.center[1] - self.radius,
                2.0 * self.radius,
                2.0 * self.radius,
            )
        })
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        self.radial_distance(x, y) <= self.radius
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        (self.radial_distance(x, y) - self.radius).abs() <= distance
    }

    fn downsample(&mut self, factor: f64) {
        self.center[0] /= factor;
        self.center[1] /= factor;
        self.radius /= factor;
        self.cache.invalidate();
    }
}
