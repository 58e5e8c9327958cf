//! Annular (ring) region of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::roi::{Roi, RoiError};

/// An annulus: all points whose distance from the centre lies in `[r0, r1]`.
///
/// The radius pair is kept ordered and non-negative by `check_radii`:
/// negatives clamp to zero, then an inner radius above the outer is lowered
/// to it; the outer radius is never raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingRoi {
    center: [f64; 2],
    radii: [f64; 2],
    #[serde(skip)]
    cache: BoundsCache,
}

impl RingRoi {
    /// Ring at `center` with inner and outer radii (normalized on entry).
    pub fn new(center: [f64; 2], r0: f64, r1: f64) -> Self {
        let mut ring = Self {
            center,
            radii: [r0, r1],
            cache: BoundsCache::new(),
        };
        ring.check_radii();
        ring
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

    /// Radius pair `[inner, outer]`.
    pub fn radii(&self) -> [f64; 2] {
        self.radii
    }

    /// Set both radii (normalized on entry).
    pub fn set_radii(&mut self, r0: f64, r1: f64) {
        self.radii = [r0, r1];
        self.check_radii();
        self.cache.invalidate();
    }

    /// Set one radius by index (0 = inner, 1 = outer), then normalize.
    pub fn set_radius(&mut self, index: usize, value: f64) -> Result<(), RoiError> {
        let slot = self
            .radii
            .get_mut(index)
            .ok_or(RoiError::InvalidIndex { index, len: 2 })?;
        *slot = value;
        self.check_radii();
        self.cache.invalidate();
        Ok(())
    }

    /// Widen the ring just enough to include the given radius.
    pub fn add_radius(&mut self, r: f64) {
        let r = r.max(0.0);
        if r < self.radii[0] {
            self.radii[0] = r;
        }
        if r > self.radii[1] {
            self.radii[1] = r;
        }
        self.cache.invalidate();
    }

    /// Ring width, `r1 − r0`.
    pub fn width(&self) -> f64 {
        self.radii[1] - self.radii[0]
    }

    fn check_radii(&mut self) {
        for r in &mut self.radii {
            if *r < 0.0 {
                *r = 0.0;
            }
        }
        if self.radii[0] > self.radii[1] {
            self.radii[0] = self.radii[1];
        }
    }

    pub(crate) fn radial_distance_from(center: [f64; 2], x: f64, y: f64) -> f64 {
        (x - center[0]).hypot(y - center[1])
    }
}

impl Default for RingRoi {
    fn default() -> Self {
        Self::new([0.0, 0.0], 0.5, 1.0)
    }
}

impl Roi for RingRoi {
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

    /// Square of side `2·r1` centred on the ring.
    fn bounds(&self) -> RectBounds {
        self.cache.get_or_compute(|| {
            let r = self.radii[1];
            RectBounds::new(self.center[0] - r, self.center[1] - r, 2.0 * r, 2.0 * r)
        })
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        let d = Self::radial_distance_from(self.center, x, y);
        d >= self.radii[0] && d <= self.radii[1]
    }

    /// Near either the inner or the outer arc.
    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        let d = Self::radial_distance_from(self.center, x, y);
        (d - self.radii[0]).abs() <= distance || (d - self.radii[1]).abs() <= distance
    }

    fn downsample(&mut self, factor: f64) {
        self.center[0] /= factor;
        self.center[1] /= factor;
        self.radii[0] /= factor;
        self.radii[1] /= factor;
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn radii_clamp_is_asymmetric() {
        // Negative radii clamp to zero.
        let ring = RingRoi::new([0.0, 0.0], -2.0, 5.0);
        assert_eq!(ring.radii(), [0.0, 5.0]);

        // Inner above outer drops to the outer, never the reverse.
        let ring = RingRoi::new([0.0, 0.0], 7.0, 5.0);
        assert_eq!(ring.radii(), [5.0, 5.0]);

        let mut ring = RingRoi::new([0.0, 0.0], 1.0, 4.0);
        ring.set_radius(1, 0.5).unwrap();
        assert_eq!(ring.radii(), [0.5, 0.5]);
    }

    #[test]
    fn radii_invariant_after_any_sequence() {
        let mut ring = RingRoi::new([0.0, 0.0], 2.0, 3.0);
        ring.set_radii(-1.0, -2.0);
        assert!(ring.radii()[0] <= ring.radii()[1]);
        assert!(ring.radii()[0] >= 0.0);
        ring.add_radius(6.0);
        ring.add_radius(-3.0);
        let [r0, r1] = ring.radii();
        assert!(r0 <= r1 && r0 >= 0.0);
        assert_relative_eq!(r1, 6.0);
    }

    #[test]
    fn invalid_radius_index() {
        let mut ring = RingRoi::default();
        assert_eq!(
            ring.set_radius(2, 1.0),
            Err(RoiError::InvalidIndex { index: 2, len: 2 })
        );
    }

    #[test]
    fn annular_containment() {
        let ring = RingRoi::new([1.0, 1.0], 2.0, 4.0);
        assert!(!ring.contains_point(1.0, 1.0), "hole is outside");
        assert!(ring.contains_point(4.0, 1.0));
        assert!(ring.contains_point(1.0, 4.9));
        assert!(!ring.contains_point(6.0, 1.0));
    }

    #[test]
    fn outline_is_both_arcs() {
        let ring = RingRoi::new([0.0, 0.0], 2.0, 4.0);
        assert!(ring.is_near_outline(2.1, 0.0, 0.2));
        assert!(ring.is_near_outline(0.0, -3.9, 0.2));
        assert!(!ring.is_near_outline(3.0, 0.0, 0.2), "mid-annulus is not near");
    }

    #[test]
    fn bounds_follow_outer_radius() {
        let ring = RingRoi::new([2.0, -1.0], 1.0, 3.0);
        assert_eq!(ring.bounds(), RectBounds::new(-1.0, -4.0, 6.0, 6.0));
    }
}
