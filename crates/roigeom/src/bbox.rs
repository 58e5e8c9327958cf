//! Axis-aligned bounding boxes and the per-shape lazy bounds cache.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box stored as origin plus side lengths.
///
/// Lengths are non-negative for every box produced by this crate. Open curves
/// (parabola, hyperbola) report [`RectBounds::unbounded`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectBounds {
    /// Origin x (minimum corner).
    pub x: f64,
    /// Origin y (minimum corner).
    pub y: f64,
    /// Side length along x.
    pub width: f64,
    /// Side length along y.
    pub height: f64,
}

impl RectBounds {
    /// Box from origin and side lengths.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero-size box sitting on a single point.
    pub fn at_point(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1], 0.0, 0.0)
    }

    /// Box spanning two arbitrary corner points.
    pub fn from_corners(a: [f64; 2], b: [f64; 2]) -> Self {
        let x = a[0].min(b[0]);
        let y = a[1].min(b[1]);
        Self::new(x, y, (a[0] - b[0]).abs(), (a[1] - b[1]).abs())
    }

    /// Sentinel covering the whole plane, used by unbounded curves.
    pub fn unbounded() -> Self {
        Self::new(
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::INFINITY,
        )
    }

    /// Whether this box is the unbounded sentinel.
    pub fn is_unbounded(&self) -> bool {
        self.width.is_infinite() || self.height.is_infinite()
    }

    /// Minimum corner.
    pub fn min_corner(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Maximum corner.
    pub fn max_corner(&self) -> [f64; 2] {
        [self.x + self.width, self.y + self.height]
    }

    /// Box centre.
    pub fn center(&self) -> [f64; 2] {
        [self.x + 0.5 * self.width, self.y + 0.5 * self.height]
    }

    /// Grow the box just enough to cover `p`.
    pub fn include_point(&mut self, p: [f64; 2]) {
        let max = self.max_corner();
        let nx = self.x.min(p[0]);
        let ny = self.y.min(p[1]);
        self.x = nx;
        self.y = ny;
        self.width = max[0].max(p[0]) - nx;
        self.height = max[1].max(p[1]) - ny;
    }

    /// Inclusive containment test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Copy grown by `d` on every side.
    pub fn inflated(&self, d: f64) -> Self {
        Self::new(
            self.x - d,
            self.y - d,
            self.width + 2.0 * d,
            self.height + 2.0 * d,
        )
    }

    /// Smallest box covering both operands.
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.include_point(other.min_corner());
        out.include_point(other.max_corner());
        out
    }

    /// Whether the two boxes overlap (inclusive edges).
    pub fn intersects(&self, other: &Self) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }
}

/// Lazily computed bounds slot shared by every shape.
///
/// Every parameter setter funnels its invalidation through [`BoundsCache::
/// invalidate`]; the cached value is therefore either absent or consistent
/// with the current parameters. Cloning yields an empty cache, so value
/// copies of a shape always start cold.
#[derive(Debug, Default)]
pub struct BoundsCache(Cell<Option<RectBounds>>);

impl BoundsCache {
    /// Fresh, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached box, computing and storing it on first use.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> RectBounds) -> RectBounds {
        if let Some(b) = self.0.get() {
            return b;
        }
        let b = compute();
        self.0.set(Some(b));
        b
    }

    /// Drop the cached value. Called by every mutating setter.
    pub fn invalidate(&self) {
        self.0.set(None);
    }

    /// Currently cached value, if any. Exposed for cache-behavior tests.
    pub fn peek(&self) -> Option<RectBounds> {
        self.0.get()
    }
}

impl Clone for BoundsCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn include_point_grows_in_all_directions() {
        let mut b = RectBounds::at_point([2.0, 3.0]);
        b.include_point([-1.0, 5.0]);
        b.include_point([4.0, 0.0]);
        assert_relative_eq!(b.x, -1.0);
        assert_relative_eq!(b.y, 0.0);
        assert_relative_eq!(b.width, 5.0);
        assert_relative_eq!(b.height, 5.0);
    }

    #[test]
    fn contains_is_inclusive() {
        let b = RectBounds::new(0.0, 0.0, 2.0, 1.0);
        assert!(b.contains(0.0, 0.0));
        assert!(b.contains(2.0, 1.0));
        assert!(b.contains(1.0, 0.5));
        assert!(!b.contains(2.0 + 1e-12, 0.5));
        assert!(!b.contains(-1e-12, 0.5));
    }

    #[test]
    fn inflated_grows_every_side() {
        let b = RectBounds::new(1.0, 1.0, 2.0, 2.0).inflated(0.5);
        assert_relative_eq!(b.x, 0.5);
        assert_relative_eq!(b.y, 0.5);
        assert_relative_eq!(b.width, 3.0);
        assert_relative_eq!(b.height, 3.0);
    }

    #[test]
    fn unbounded_contains_everything() {
        let b = RectBounds::unbounded();
        assert!(b.is_unbounded());
        assert!(b.contains(1e300, -1e300));
    }

    #[test]
    fn union_covers_both() {
        let a = RectBounds::new(0.0, 0.0, 1.0, 1.0);
        let b = RectBounds::new(3.0, -1.0, 1.0, 1.0);
        let u = a.union(&b);
        assert!(u.contains(0.5, 0.5));
        assert!(u.contains(3.5, -0.5));
    }

    #[test]
    fn cache_computes_once_and_invalidates() {
        let cache = BoundsCache::new();
        let mut calls = 0;
        let b = cache.get_or_compute(|| {
            calls += 1;
            RectBounds::new(0.0, 0.0, 1.0, 1.0)
        });
        assert_eq!(calls, 1);
        let b2 = cache.get_or_compute(|| {
            calls += 1;
            RectBounds::new(9.0, 9.0, 9.0, 9.0)
        });
        assert_eq!(calls, 1, "second call must hit the cache");
        assert_eq!(b, b2);

        cache.invalidate();
        assert!(cache.peek().is_none());
    }

    #[test]
    fn cloned_cache_starts_cold() {
        let cache = BoundsCache::new();
        cache.get_or_compute(|| RectBounds::new(0.0, 0.0, 1.0, 1.0));
        assert!(cache.peek().is_some());
        let copy = cache.clone();
        assert!(copy.peek().is_none());
    }
}
