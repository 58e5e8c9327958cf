//! Rotated rectangle region of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::orient::Orientation;
use crate::roi::{dist_to_segment, Roi, RoiError};

/// A rectangle anchored at a start corner, rotated about that corner.
///
/// The clipping-compensation flag is carried for external consumers (overlay
/// pipelines compensate half-open pixel clipping with it); it has no effect
/// on the geometry computed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RectRoi {
    start: [f64; 2],
    lengths: [f64; 2],
    orient: Orientation,
    clip_compensation: bool,
    #[serde(skip)]
    cache: BoundsCache,
}

impl RectRoi {
    /// Rectangle from its start corner, side lengths and rotation angle.
    pub fn new(start: [f64; 2], width: f64, height: f64, angle: f64) -> Self {
        Self {
            start,
            lengths: [width, height],
            orient: Orientation::new(angle),
            clip_compensation: false,
            cache: BoundsCache::new(),
        }
    }

    /// Start corner.
    pub fn start(&self) -> [f64; 2] {
        self.start
    }

    /// Side lengths `[width, height]`.
    pub fn lengths(&self) -> [f64; 2] {
        self.lengths
    }

    /// Set both side lengths.
    pub fn set_lengths(&mut self, width: f64, height: f64) {
        self.lengths = [width, height];
        self.cache.invalidate();
    }

    /// Set one side length by axis index (0 = width, 1 = height).
    pub fn set_length(&mut self, axis: usize, value: f64) -> Result<(), RoiError> {
        let slot = self
            .lengths
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

    /// Clipping-compensation flag (no geometric effect).
    pub fn clip_compensation(&self) -> bool {
        self.clip_compensation
    }

    /// Set the clipping-compensation flag.
    pub fn set_clip_compensation(&mut self, on: bool) {
        self.clip_compensation = on;
    }

    /// Point at fractional coordinates of the rotated frame:
    /// `(0, 0)` is the start corner, `(1, 1)` the far corner.
    pub fn point_at(&self, fx: f64, fy: f64) -> [f64; 2] {
        let lx = fx * self.lengths[0];
        let ly = fy * self.lengths[1];
        let g = self.orient.to_global([lx, ly]);
        [self.start[0] + g[0], self.start[1] + g[1]]
    }

    /// Far corner, opposite the start corner.
    pub fn end_point(&self) -> [f64; 2] {
        self.point_at(1.0, 1.0)
    }

    /// Rectangle centre.
    pub fn center(&self) -> [f64; 2] {
        self.point_at(0.5, 0.5)
    }

    /// Re-anchor the far corner. Start and target are expressed in the
    /// rotated frame and reordered per axis, so the start corner may move but
    /// both lengths stay non-negative.
    pub fn set_end_point(&mut self, end: [f64; 2]) {
        let ls = self.orient.to_local(self.start);
        let le = self.orient.to_local(end);
        let lo = [ls[0].min(le[0]), ls[1].min(le[1])];
        self.lengths = [(le[0] - ls[0]).abs(), (le[1] - ls[1]).abs()];
        self.start = self.orient.to_global(lo);
        self.cache.invalidate();
    }

    /// Re-anchor the far corner while pinning the start corner. A target
    /// behind the start clamps the affected length to zero, never errors.
    pub fn set_end_point_fixed_start(&mut self, end: [f64; 2]) {
        let rel = [end[0] - self.start[0], end[1] - self.start[1]];
        let local = self.orient.to_local(rel);
        self.lengths = [local[0].max(0.0), local[1].max(0.0)];
        self.cache.invalidate();
    }

    fn compute_bounds(&self) -> RectBounds {
        let [w, h] = self.lengths;
        let (sin, cos) = (self.orient.sin(), self.orient.cos());
        if self.orient.angle() == 0.0 {
            return RectBounds::new(self.start[0], self.start[1], w, h);
        }

        let bw = cos.abs() * w + sin.abs() * h;
        let bh = sin.abs() * w + cos.abs() * h;
        // Anchor the box at the extreme corner for the quadrant of (sin, cos).
        let [sx, sy] = self.start;
        let (ox, oy) = if cos >= 0.0 && sin >= 0.0 {
            (sx - sin * h, sy)
        } else if cos < 0.0 && sin >= 0.0 {
            (sx + cos * w - sin * h, sy + cos * h)
        } else if cos < 0.0 && sin < 0.0 {
            (sx + cos * w, sy + sin * w + cos * h)
        } else {
            (sx, sy + sin * w)
        };
        RectBounds::new(ox, oy, bw, bh)
    }

    fn corners(&self) -> [[f64; 2]; 4] {
        [
            self.point_at(0.0, 0.0),
            self.point_at(1.0, 0.0),
            self.point_at(1.0, 1.0),
            self.point_at(0.0, 1.0),
        ]
    }
}

impl Roi for RectRoi {
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
        self.cache.get_or_compute(|| self.compute_bounds())
    }

    /// Inverse-rotate into the local frame and test both axis ranges.
    fn contains_point(&self, x: f64, y: f64) -> bool {
        let local = self
            .orient
            .to_local([x - self.start[0], y - self.start[1]]);
        local[0] >= 0.0
            && local[0] <= self.lengths[0]
            && local[1] >= 0.0
            && local[1] <= self.lengths[1]
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        let c = self.corners();
        (0..4).any(|i| dist_to_segment([x, y], c[i], c[(i + 1) % 4]) <= distance)
    }

    fn downsample(&mut self, factor: f64) {
        self.start[0] /= factor;
        self.start[1] /= factor;
        self.lengths[0] /= factor;
        self.lengths[1] /= factor;
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn assert_bounds_close(b: RectBounds, x: f64, y: f64, w: f64, h: f64) {
        assert_relative_eq!(b.x, x, epsilon = 1e-12);
        assert_relative_eq!(b.y, y, epsilon = 1e-12);
        assert_relative_eq!(b.width, w, epsilon = 1e-12);
        assert_relative_eq!(b.height, h, epsilon = 1e-12);
    }

    #[test]
    fn axis_aligned_bounds_are_the_rect() {
        let r = RectRoi::new([1.0, 2.0], 4.0, 3.0, 0.0);
        assert_bounds_close(r.bounds(), 1.0, 2.0, 4.0, 3.0);
    }

    #[test]
    fn bounds_match_corners_in_every_quadrant() {
        for &angle in &[
            0.3,
            FRAC_PI_2 + 0.3,
            PI + 0.3,
            3.0 * FRAC_PI_2 + 0.3,
            FRAC_PI_4,
        ] {
            let r = RectRoi::new([5.0, -2.0], 4.0, 3.0, angle);
            let b = r.bounds();
            let mut expect = RectBounds::at_point(r.point_at(0.0, 0.0));
            for &(fx, fy) in &[(1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                expect.include_point(r.point_at(fx, fy));
            }
            assert_bounds_close(b, expect.x, expect.y, expect.width, expect.height);
        }
    }

    #[test]
    fn containment_in_local_frame() {
        let r = RectRoi::new([0.0, 0.0], 4.0, 2.0, FRAC_PI_2);
        // Rotated 90°: occupies x in [-2, 0], y in [0, 4].
        assert!(r.contains_point(-1.0, 2.0));
        assert!(!r.contains_point(1.0, 2.0));
        assert!(r.contains_point(0.0, 0.0));
        assert!(r.contains_point(-2.0, 4.0));
    }

    #[test]
    fn set_end_point_reorders_axes() {
        let mut r = RectRoi::new([5.0, 5.0], 1.0, 1.0, 0.0);
        r.set_end_point([2.0, 8.0]);
        // Start moves to the min corner in the (unrotated) local frame.
        assert_relative_eq!(r.start()[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(r.start()[1], 5.0, epsilon = 1e-12);
        assert_relative_eq!(r.lengths()[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.lengths()[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn set_end_point_fixed_start_clamps_negative_lengths() {
        let mut r = RectRoi::new([5.0, 5.0], 1.0, 1.0, 0.0);
        r.set_end_point_fixed_start([2.0, 8.0]);
        assert_eq!(r.start(), [5.0, 5.0]);
        assert_eq!(r.lengths(), [0.0, 3.0]);
    }

    #[test]
    fn set_end_point_respects_rotation() {
        let mut r = RectRoi::new([0.0, 0.0], 1.0, 1.0, FRAC_PI_2);
        r.set_end_point_fixed_start([-2.0, 3.0]);
        // Local frame: x' along +y, y' along -x.
        assert_relative_eq!(r.lengths()[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.lengths()[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn outline_proximity_on_edges() {
        let r = RectRoi::new([0.0, 0.0], 4.0, 2.0, 0.0);
        assert!(r.is_near_outline(2.0, -0.3, 0.5));
        assert!(r.is_near_outline(4.2, 1.0, 0.5));
        assert!(!r.is_near_outline(2.0, 1.0, 0.5), "deep interior is not near");
    }

    #[test]
    fn invalid_axis_index() {
        let mut r = RectRoi::new([0.0, 0.0], 1.0, 1.0, 0.0);
        assert_eq!(
            r.set_length(2, 5.0),
            Err(RoiError::InvalidIndex { index: 2, len: 2 })
        );
        assert!(r.set_length(1, 5.0).is_ok());
        assert_eq!(r.lengths(), [1.0, 5.0]);
    }

    #[test]
    fn mutation_refreshes_bounds() {
        let mut r = RectRoi::new([0.0, 0.0], 2.0, 2.0, 0.0);
        let b1 = r.bounds();
        assert_eq!(b1, r.bounds());
        r.set_lengths(6.0, 2.0);
        let b2 = r.bounds();
        assert_relative_eq!(b2.width, 6.0);
    }
}
