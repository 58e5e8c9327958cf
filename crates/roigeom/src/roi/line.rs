//! Finite line segment region of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::orient::Orientation;
use crate::roi::{dist_to_segment, Roi};

/// A finite segment anchored at a start point, described by angle and length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineRoi {
    start: [f64; 2],
    orient: Orientation,
    length: f64,
    #[serde(skip)]
    cache: BoundsCache,
}

impl LineRoi {
    /// Segment from `start` at `angle` radians with the given length.
    pub fn new(start: [f64; 2], angle: f64, length: f64) -> Self {
        Self {
            start,
            orient: Orientation::new(angle),
            length,
            cache: BoundsCache::new(),
        }
    }

    /// Segment between two end points.
    pub fn from_points(start: [f64; 2], end: [f64; 2]) -> Self {
        let mut line = Self::new(start, 0.0, 0.0);
        line.set_end_point(end);
        line
    }

    /// Start point.
    pub fn start(&self) -> [f64; 2] {
        self.start
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Set the segment length, keeping start and angle.
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.cache.invalidate();
    }

    /// Normalized angle in radians.
    pub fn angle(&self) -> f64 {
        self.orient.angle()
    }

    /// Normalized angle in degrees.
    pub fn angle_degrees(&self) -> f64 {
        self.orient.angle_degrees()
    }

    /// Set the angle in radians.
    pub fn set_angle(&mut self, angle: f64) {
        self.orient.set_angle(angle);
        self.cache.invalidate();
    }

    /// Set the angle in degrees.
    pub fn set_angle_degrees(&mut self, degrees: f64) {
        self.set_angle(degrees.to_radians());
    }

    /// Point at fraction `t` along the segment (`t = 0` start, `t = 1` end).
    pub fn point_at(&self, t: f64) -> [f64; 2] {
        let d = t * self.length;
        [
            self.start[0] + d * self.orient.cos(),
            self.start[1] + d * self.orient.sin(),
        ]
    }

    /// End point of the segment.
    pub fn end_point(&self) -> [f64; 2] {
        self.point_at(1.0)
    }

    /// Midpoint of the segment.
    pub fn midpoint(&self) -> [f64; 2] {
        self.point_at(0.5)
    }

    /// Re-anchor the far end, re-deriving angle and length from the start.
    pub fn set_end_point(&mut self, end: [f64; 2]) {
        let dx = end[0] - self.start[0];
        let dy = end[1] - self.start[1];
        self.length = (dx * dx + dy * dy).sqrt();
        self.orient.set_angle(dy.atan2(dx));
        self.cache.invalidate();
    }
}

impl Roi for LineRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.start
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        self.start = p;
        self.cache.invalidate();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.start[0] += dx;
        self.start[1] += dy;
        self.cache.invalidate();
    }

    fn bounds(&self) -> RectBounds {
        self.cache
            .get_or_compute(|| RectBounds::from_corners(self.start, self.end_point()))
    }

    /// A segment has no interior.
    fn contains_point(&self, _x: f64, _y: f64) -> bool {
        false
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        dist_to_segment([x, y], self.start, self.end_point()) <= distance
    }

    fn downsample(&mut self, factor: f64) {
        self.start[0] /= factor;
        self.start[1] /= factor;
        self.length /= factor;
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn point_at_interpolates() {
        let line = LineRoi::new([1.0, 1.0], 0.0, 4.0);
        assert_eq!(line.point_at(0.0), [1.0, 1.0]);
        assert_eq!(line.end_point(), [5.0, 1.0]);
        assert_eq!(line.midpoint(), [3.0, 1.0]);
    }

    #[test]
    fn set_end_point_rederives_angle_and_length() {
        let mut line = LineRoi::new([0.0, 0.0], 0.0, 1.0);
        line.set_end_point([0.0, 3.0]);
        assert_relative_eq!(line.angle(), FRAC_PI_2);
        assert_relative_eq!(line.length(), 3.0);
        let end = line.end_point();
        assert_relative_eq!(end[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(end[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn no_interior_but_near_outline() {
        let line = LineRoi::from_points([0.0, 0.0], [10.0, 0.0]);
        assert!(!line.contains_point(5.0, 0.0));
        assert!(line.is_near_outline(5.0, 0.4, 0.5));
        assert!(!line.is_near_outline(5.0, 0.6, 0.5));
        assert!(!line.is_near_outline(12.0, 0.0, 0.5));
    }

    #[test]
    fn bounds_cover_both_ends() {
        let line = LineRoi::from_points([2.0, 5.0], [-1.0, 1.0]);
        let b = line.bounds();
        assert_eq!(b.min_corner(), [-1.0, 1.0]);
        assert_eq!(b.max_corner(), [2.0, 5.0]);
    }

    #[test]
    fn downsample_scales_start_and_length() {
        let mut line = LineRoi::new([4.0, 8.0], 0.0, 6.0);
        line.downsample(2.0);
        assert_eq!(line.start(), [2.0, 4.0]);
        assert_relative_eq!(line.length(), 3.0);
    }
}
