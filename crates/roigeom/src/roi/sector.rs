//! Annular-wedge (sector) region of interest with symmetry mapping.

use std::cell::Cell;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundsCache, RectBounds};
use crate::roi::{dist_to_segment, RingRoi, Roi, RoiError};

/// Rule mapping a sector's primary angular wedge onto an equivalent
/// secondary wedge, used to double integration statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorSymmetry {
    /// No secondary wedge.
    None,
    /// The whole circle; no distinct secondary wedge.
    Full,
    /// Reflection across the horizontal axis: `(π − end, π − start)`.
    XReflect,
    /// Reflection across the vertical axis: `(2π − end, 2π − start)`.
    YReflect,
    /// Rotation by +90°.
    Ccw90,
    /// Rotation by −90°.
    Cw90,
    /// Point inversion through the centre (rotation by 180°).
    Invert,
}

/// An annular wedge: radius in `[r0, r1]`, polar angle in `[start, end]`,
/// with an optional symmetry-mapped secondary wedge.
///
/// Invariants maintained by the setters: `0 ≤ r0 ≤ r1` (same asymmetric
/// clamp as [`RingRoi`]), `start ∈ [0, 2π)` and `start ≤ end ≤ start + 2π`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorRoi {
    center: [f64; 2],
    radii: [f64; 2],
    angles: [f64; 2],
    symmetry: SectorSymmetry,
    #[serde(skip)]
    cache: BoundsCache,
    /// Secondary-wedge angles, populated as a side effect of `bounds()` and
    /// consumed by `contains_point`.
    #[serde(skip)]
    sym_cache: Cell<Option<Option<(f64, f64)>>>,
}

impl SectorRoi {
    /// Sector at `center` with `[r0, r1]` radii and `[start, end]` angles
    /// (both pairs normalized on entry).
    pub fn new(center: [f64; 2], radii: [f64; 2], angles: [f64; 2]) -> Self {
        let mut sector = Self {
            center,
            radii,
            angles,
            symmetry: SectorSymmetry::None,
            cache: BoundsCache::new(),
            sym_cache: Cell::new(None),
        };
        sector.check_radii();
        sector.check_angles();
        sector
    }

    fn invalidate(&self) {
        self.cache.invalidate();
        self.sym_cache.set(None);
    }

    /// Centre.
    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Move the centre.
    pub fn set_center(&mut self, center: [f64; 2]) {
        self.center = center;
        self.invalidate();
    }

    /// Radius pair `[inner, outer]`.
    pub fn radii(&self) -> [f64; 2] {
        self.radii
    }

    /// Set both radii (normalized on entry).
    pub fn set_radii(&mut self, r0: f64, r1: f64) {
        self.radii = [r0, r1];
        self.check_radii();
        self.invalidate();
    }

    /// Set one radius by index (0 = inner, 1 = outer), then normalize.
    pub fn set_radius(&mut self, index: usize, value: f64) -> Result<(), RoiError> {
        let slot = self
            .radii
            .get_mut(index)
            .ok_or(RoiError::InvalidIndex { index, len: 2 })?;
        *slot = value;
        self.check_radii();
        self.invalidate();
        Ok(())
    }

    /// Angle pair `[start, end]` in radians.
    pub fn angles(&self) -> [f64; 2] {
        self.angles
    }

    /// Angle pair in degrees.
    pub fn angles_degrees(&self) -> [f64; 2] {
        [self.angles[0].to_degrees(), self.angles[1].to_degrees()]
    }

    /// Set the angular span in radians (normalized on entry).
    pub fn set_angles(&mut self, start: f64, end: f64) {
        self.angles = [start, end];
        self.check_angles();
        self.invalidate();
    }

    /// Set the angular span in degrees.
    pub fn set_angles_degrees(&mut self, start: f64, end: f64) {
        self.set_angles(start.to_radians(), end.to_radians());
    }

    /// Set one span angle by index (0 = start, 1 = end), then normalize.
    pub fn set_angle(&mut self, index: usize, value: f64) -> Result<(), RoiError> {
        let slot = self
            .angles
            .get_mut(index)
            .ok_or(RoiError::InvalidIndex { index, len: 2 })?;
        *slot = value;
        self.check_angles();
        self.invalidate();
        Ok(())
    }

    /// Active symmetry mode.
    pub fn symmetry(&self) -> SectorSymmetry {
        self.symmetry
    }

    /// Activate a symmetry mode; rejects modes whose secondary wedge cannot
    /// coexist with the primary span.
    pub fn set_symmetry(&mut self, symmetry: SectorSymmetry) -> Result<(), RoiError> {
        if !self.check_symmetry(symmetry) {
            return Err(RoiError::UnsupportedSymmetry { symmetry });
        }
        self.symmetry = symmetry;
        self.invalidate();
        Ok(())
    }

    /// Whether the primary span lies within the band `symmetry` requires.
    pub fn check_symmetry(&self, symmetry: SectorSymmetry) -> bool {
        let [s, e] = self.angles;
        match symmetry {
            SectorSymmetry::None | SectorSymmetry::Full => true,
            SectorSymmetry::XReflect => (s <= PI && e <= PI) || (s >= PI && e <= TAU),
            SectorSymmetry::YReflect => {
                (s >= FRAC_PI_2 && e <= 3.0 * FRAC_PI_2)
                    || (s >= 3.0 * FRAC_PI_2 && e <= TAU + FRAC_PI_2)
            }
            SectorSymmetry::Ccw90 | SectorSymmetry::Cw90 => e - s <= FRAC_PI_2,
            SectorSymmetry::Invert => e - s <= PI,
        }
    }

    /// Secondary-wedge angle pair for the active symmetry, if any.
    pub fn symmetry_angles(&self) -> Option<(f64, f64)> {
        let [s, e] = self.angles;
        match self.symmetry {
            SectorSymmetry::None | SectorSymmetry::Full => None,
            SectorSymmetry::XReflect => Some((PI - e, PI - s)),
            SectorSymmetry::YReflect => Some((TAU - e, TAU - s)),
            SectorSymmetry::Ccw90 => Some((s + FRAC_PI_2, e + FRAC_PI_2)),
            SectorSymmetry::Cw90 => Some((s - FRAC_PI_2, e - FRAC_PI_2)),
            SectorSymmetry::Invert => Some((s + PI, e + PI)),
        }
    }

    /// Clamp negatives to zero, then lower an inner radius above the outer
    /// (same asymmetric rule as [`RingRoi`]).
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

    /// Shift `end` by whole turns until `start ≤ end ≤ start + 2π`, then
    /// shift both until `start ∈ [0, 2π)`. A full-circle span survives.
    fn check_angles(&mut self) {
        let [mut s, mut e] = self.angles;
        while e < s {
            e += TAU;
        }
        while e > s + TAU {
            e -= TAU;
        }
        while s < 0.0 {
            s += TAU;
            e += TAU;
        }
        while s >= TAU {
            s -= TAU;
            e -= TAU;
        }
        self.angles = [s, e];
    }

    /// Whether polar angle `a ∈ [0, 2π)` falls in the (possibly wrapped)
    /// span `[s, e]`.
    fn in_span(a: f64, s: f64, e: f64) -> bool {
        (a >= s && a <= e) || (a + TAU >= s && a + TAU <= e) || (a - TAU >= s && a - TAU <= e)
    }

    fn accumulate_span(&self, b: &mut RectBounds, s: f64, e: f64) {
        let [cx, cy] = self.center;
        let [r0, r1] = self.radii;
        for &r in &[r0, r1] {
            for &a in &[s, e] {
                b.include_point([cx + r * a.cos(), cy + r * a.sin()]);
            }
        }
        // Axis crossings strictly inside the span, at the outer radius.
        let mut k = (s / FRAC_PI_2).floor() + 1.0;
        while k * FRAC_PI_2 < e {
            let a = k * FRAC_PI_2;
            if a > s {
                b.include_point([cx + r1 * a.cos(), cy + r1 * a.sin()]);
            }
            k += 1.0;
        }
    }

    fn compute_bounds(&self) -> RectBounds {
        let [s, e] = self.angles;
        let sym = self.symmetry_angles();
        self.sym_cache.set(Some(sym));

        let first = [
            self.center[0] + self.radii[0] * s.cos(),
            self.center[1] + self.radii[0] * s.sin(),
        ];
        let mut b = RectBounds::at_point(first);
        self.accumulate_span(&mut b, s, e);
        if let Some((ss, se)) = sym {
            self.accumulate_span(&mut b, ss, se);
        }
        b
    }

    fn polar_angle(&self, x: f64, y: f64) -> f64 {
        let mut a = (y - self.center[1]).atan2(x - self.center[0]);
        if a < 0.0 {
            a += TAU;
        }
        a
    }
}

impl Default for SectorRoi {
    fn default() -> Self {
        Self::new([0.0, 0.0], [0.5, 1.0], [0.0, FRAC_PI_2])
    }
}

impl Roi for SectorRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.center
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        self.set_center(p);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.center[0] += dx;
        self.center[1] += dy;
        self.invalidate();
    }

    /// Wedge corners plus every axis crossing inside the span at the outer
    /// radius, repeated for the symmetry-mapped span when one is active.
    fn bounds(&self) -> RectBounds {
        self.cache.get_or_compute(|| self.compute_bounds())
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        // Populates the secondary-wedge cache on a cold shape.
        self.bounds();

        let d = RingRoi::radial_distance_from(self.center, x, y);
        if d < self.radii[0] || d > self.radii[1] {
            return false;
        }
        let a = self.polar_angle(x, y);
        let [s, e] = self.angles;
        if Self::in_span(a, s, e) {
            return true;
        }
        match self.sym_cache.get().flatten() {
            Some((ss, se)) => Self::in_span(a, ss, se),
            None => false,
        }
    }

    /// Near either arc while inside the span, or near either radial edge.
    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        let [cx, cy] = self.center;
        let [r0, r1] = self.radii;
        let [s, e] = self.angles;

        let d = RingRoi::radial_distance_from(self.center, x, y);
        let a = self.polar_angle(x, y);
        if ((d - r0).abs() <= distance || (d - r1).abs() <= distance) && Self::in_span(a, s, e) {
            return true;
        }
        for &edge in &[s, e] {
            let dir = [edge.cos(), edge.sin()];
            let p0 = [cx + r0 * dir[0], cy + r0 * dir[1]];
            let p1 = [cx + r1 * dir[0], cy + r1 * dir[1]];
            if dist_to_segment([x, y], p0, p1) <= distance {
                return true;
            }
        }
        false
    }

    fn downsample(&mut self, factor: f64) {
        self.center[0] /= factor;
        self.center[1] /= factor;
        self.radii[0] /= factor;
        self.radii[1] /= factor;
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn deg(d: f64) -> f64 {
        d.to_radians()
    }

    #[test]
    fn angles_normalize_into_invariant_band() {
        let mut sec = SectorRoi::default();
        sec.set_angles(-FRAC_PI_2, FRAC_PI_2);
        let [s, e] = sec.angles();
        assert_relative_eq!(s, 3.0 * FRAC_PI_2);
        assert_relative_eq!(e, 5.0 * FRAC_PI_2);
        assert!(s >= 0.0 && s < TAU);
        assert!(e >= s && e <= s + TAU);

        // Over-long spans lose whole turns.
        sec.set_angles(0.0, 3.0 * PI);
        let [s, e] = sec.angles();
        assert_relative_eq!(s, 0.0);
        assert_relative_eq!(e, PI);
    }

    #[test]
    fn full_circle_span_survives_normalization() {
        let mut sec = SectorRoi::default();
        sec.set_angles(0.0, TAU);
        assert_eq!(sec.angles(), [0.0, TAU]);
    }

    #[test]
    fn symmetry_angle_mapping() {
        let mut sec = SectorRoi::new([0.0, 0.0], [1.0, 2.0], [deg(10.0), deg(80.0)]);

        sec.set_symmetry(SectorSymmetry::XReflect).unwrap();
        let (ss, se) = sec.symmetry_angles().unwrap();
        assert_relative_eq!(ss, deg(100.0), epsilon = 1e-12);
        assert_relative_eq!(se, deg(170.0), epsilon = 1e-12);

        sec.set_symmetry(SectorSymmetry::Invert).unwrap();
        let (ss, se) = sec.symmetry_angles().unwrap();
        assert_relative_eq!(ss, deg(190.0), epsilon = 1e-12);
        assert_relative_eq!(se, deg(260.0), epsilon = 1e-12);

        sec.set_symmetry(SectorSymmetry::Ccw90).unwrap();
        let (ss, _) = sec.symmetry_angles().unwrap();
        assert_relative_eq!(ss, deg(100.0), epsilon = 1e-12);

        sec.set_symmetry(SectorSymmetry::Full).unwrap();
        assert!(sec.symmetry_angles().is_none());
    }

    #[test]
    fn symmetry_band_validation() {
        // Span straddling π cannot X-reflect without overlap.
        let sec = SectorRoi::new([0.0, 0.0], [1.0, 2.0], [deg(150.0), deg(210.0)]);
        assert!(!sec.check_symmetry(SectorSymmetry::XReflect));
        assert!(sec.check_symmetry(SectorSymmetry::YReflect));

        // Quarter-turn rotations need a span of at most 90°.
        let mut wide = SectorRoi::new([0.0, 0.0], [1.0, 2.0], [0.0, deg(120.0)]);
        assert!(!wide.check_symmetry(SectorSymmetry::Ccw90));
        assert!(wide.check_symmetry(SectorSymmetry::Invert));
        assert_eq!(
            wide.set_symmetry(SectorSymmetry::Cw90),
            Err(RoiError::UnsupportedSymmetry {
                symmetry: SectorSymmetry::Cw90
            })
        );
        assert_eq!(wide.symmetry(), SectorSymmetry::None);
    }

    #[test]
    fn x_reflect_contains_mirrored_wedge() {
        let mut sec = SectorRoi::new([0.0, 0.0], [2.0, 4.0], [deg(10.0), deg(80.0)]);
        sec.set_symmetry(SectorSymmetry::XReflect).unwrap();

        // Polar angle 170° at mid radius: inside the mirrored wedge only.
        let p = [3.0 * deg(170.0).cos(), 3.0 * deg(170.0).sin()];
        assert!(sec.contains_point(p[0], p[1]));

        // Primary wedge still works.
        let q = [3.0 * deg(45.0).cos(), 3.0 * deg(45.0).sin()];
        assert!(sec.contains_point(q[0], q[1]));

        // Outside both wedges.
        let r = [3.0 * deg(260.0).cos(), 3.0 * deg(260.0).sin()];
        assert!(!sec.contains_point(r[0], r[1]));
    }

    #[test]
    fn wrapped_span_containment() {
        // Span from 315° to 405°, crossing the 0° seam.
        let sec = SectorRoi::new([0.0, 0.0], [1.0, 3.0], [deg(-45.0), deg(45.0)]);
        assert!(sec.contains_point(2.0, 0.0));
        assert!(sec.contains_point(2.0 * deg(30.0).cos(), 2.0 * deg(30.0).sin()));
        assert!(!sec.contains_point(0.0, 2.0));
        assert!(!sec.contains_point(0.5, 0.0), "inside the hole");
    }

    #[test]
    fn bounds_include_axis_crossings() {
        // Span (45°, 135°) crosses the +y axis: top edge must reach r1.
        let sec = SectorRoi::new([0.0, 0.0], [1.0, 2.0], [deg(45.0), deg(135.0)]);
        let b = sec.bounds();
        assert_relative_eq!(b.max_corner()[1], 2.0, epsilon = 1e-12);
        // No crossing below: bottom stays at the corner height.
        assert_relative_eq!(b.min_corner()[1], (deg(45.0)).sin(), epsilon = 1e-12);
    }

    #[test]
    fn bounds_cover_symmetric_wedge() {
        let mut sec = SectorRoi::new([0.0, 0.0], [1.0, 2.0], [deg(10.0), deg(80.0)]);
        let primary_only = sec.bounds();
        assert!(primary_only.min_corner()[0] >= 0.0);

        sec.set_symmetry(SectorSymmetry::XReflect).unwrap();
        let with_sym = sec.bounds();
        // Mirrored wedge reaches into negative x.
        assert!(with_sym.min_corner()[0] < -1.9);
    }

    #[test]
    fn contains_populates_symmetry_cache_lazily() {
        let mut sec = SectorRoi::new([0.0, 0.0], [2.0, 4.0], [deg(10.0), deg(80.0)]);
        sec.set_symmetry(SectorSymmetry::XReflect).unwrap();
        assert!(sec.sym_cache.get().is_none(), "cold after mutation");

        let p = [3.0 * deg(170.0).cos(), 3.0 * deg(170.0).sin()];
        assert!(sec.contains_point(p[0], p[1]));
        assert!(sec.sym_cache.get().is_some(), "populated via bounds()");
    }

    #[test]
    fn outline_arcs_and_radial_edges() {
        let sec = SectorRoi::new([0.0, 0.0], [2.0, 4.0], [0.0, FRAC_PI_2]);
        // Outer arc, inside the span.
        assert!(sec.is_near_outline(4.0 * deg(45.0).cos(), 4.0 * deg(45.0).sin(), 0.1));
        // Inner arc.
        assert!(sec.is_near_outline(2.0 * deg(45.0).cos(), 2.0 * deg(45.0).sin(), 0.1));
        // Radial edge at the start angle.
        assert!(sec.is_near_outline(3.0, -0.05, 0.1));
        // Mid-wedge interior is not near anything.
        assert!(!sec.is_near_outline(3.0 * deg(45.0).cos(), 3.0 * deg(45.0).sin(), 0.1));
        // Outer-arc distance but outside the span.
        assert!(!sec.is_near_outline(4.0 * deg(200.0).cos(), 4.0 * deg(200.0).sin(), 0.1));
    }

    #[test]
    fn radii_share_ring_clamp() {
        let sec = SectorRoi::new([0.0, 0.0], [5.0, 3.0], [0.0, PI]);
        assert_eq!(sec.radii(), [3.0, 3.0]);
        let sec = SectorRoi::new([0.0, 0.0], [-1.0, 3.0], [0.0, PI]);
        assert_eq!(sec.radii(), [0.0, 3.0]);
    }

    #[test]
    fn downsample_scales_lengths_not_angles() {
        let mut sec = SectorRoi::new([4.0, 8.0], [2.0, 6.0], [deg(10.0), deg(80.0)]);
        sec.downsample(2.0);
        assert_eq!(sec.center(), [2.0, 4.0]);
        assert_eq!(sec.radii(), [1.0, 3.0]);
        assert_relative_eq!(sec.angles()[0], deg(10.0));
    }
}
