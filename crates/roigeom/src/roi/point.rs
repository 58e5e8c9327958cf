//! Single-point region of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::roi::Roi;

/// A single marked point on the image plane.
///
/// Bounds are the zero-size box at the point, so the inherited containment
/// test only accepts the point itself and outline proximity degenerates to a
/// square neighborhood.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointRoi {
    point: [f64; 2],
    #[serde(skip)]
    cache: BoundsCache,
}

impl PointRoi {
    /// Point ROI at `p`.
    pub fn new(p: [f64; 2]) -> Self {
        Self {
            point: p,
            cache: BoundsCache::new(),
        }
    }

    /// Coordinates of the point.
    pub fn point(&self) -> [f64; 2] {
        self.point
    }

    /// Move the point.
    pub fn set_point(&mut self, p: [f64; 2]) {
        self.point = p;
        self.cache.invalidate();
    }
}

impl Roi for PointRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.point
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        self.set_point(p);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.point[0] += dx;
        self.point[1] += dy;
        self.cache.invalidate();
    }

    fn bounds(&self) -> RectBounds {
        self.cache.get_or_compute(|| RectBounds::at_point(self.point))
    }

    fn downsample(&mut self, factor: f64) {
        self.point[0] /= factor;
        self.point[1] /= factor;
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_bounds() {
        let p = PointRoi::new([3.0, 4.0]);
        let b = p.bounds();
        assert_eq!(b, RectBounds::new(3.0, 4.0, 0.0, 0.0));
        assert!(p.contains_point(3.0, 4.0));
        assert!(!p.contains_point(3.0 + 1e-12, 4.0));
    }

    #[test]
    fn near_outline_is_square_neighborhood() {
        let p = PointRoi::new([0.0, 0.0]);
        assert!(p.is_near_outline(0.4, -0.4, 0.5));
        assert!(!p.is_near_outline(0.6, 0.0, 0.5));
    }

    #[test]
    fn downsample_divides_coordinates() {
        let mut p = PointRoi::new([8.0, 6.0]);
        p.downsample(2.0);
        assert_eq!(p.point(), [4.0, 3.0]);
    }
}
