//! Region-of-interest shapes over a 2D detector image plane.
//!
//! Every shape implements the [`Roi`] capability trait (reference point,
//! bounds, containment, outline proximity, downsampling). Shapes that rotate
//! embed an [`crate::Orientation`]; conic shapes additionally expose
//! parametric-angle evaluation. The closed set of variants is collected in
//! [`RoiShape`], keyed by [`RoiKind`].

pub mod circle;
pub mod ellipse;
pub mod hyperbola;
pub mod line;
pub mod parabola;
pub mod point;
pub mod polyline;
pub mod rect;
pub mod ring;
pub mod sector;

pub use circle::CircleRoi;
pub use ellipse::EllipseRoi;
pub use hyperbola::HyperbolaRoi;
pub use line::LineRoi;
pub use parabola::ParabolaRoi;
pub use point::PointRoi;
pub use polyline::{PolygonRoi, PolylineRoi};
pub use rect::RectRoi;
pub use ring::RingRoi;
pub use sector::{SectorRoi, SectorSymmetry};

use serde::{Deserialize, Serialize};

use crate::bbox::RectBounds;
use crate::fit::{FittedCircleRoi, FittedEllipseRoi};

// ── Errors ─────────────────────────────────────────────────────────────────

/// Errors raised by shape-parameter accessors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoiError {
    /// An axis/radius/vertex index was out of range.
    InvalidIndex {
        /// Offending index.
        index: usize,
        /// Number of addressable entries.
        len: usize,
    },
    /// The sector's angular span does not fit the band a symmetry requires.
    UnsupportedSymmetry {
        /// Rejected symmetry mode.
        symmetry: SectorSymmetry,
    },
}

impl std::fmt::Display for RoiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIndex { index, len } => {
                write!(f, "index {} out of range for {} entries", index, len)
            }
            Self::UnsupportedSymmetry { symmetry } => {
                write!(f, "sector span does not admit {:?} symmetry", symmetry)
            }
        }
    }
}

impl std::error::Error for RoiError {}

// ── Capability trait ───────────────────────────────────────────────────────

/// Common operations every region of interest supports.
///
/// `bounds` is lazily computed and cached per shape; any mutating setter
/// invalidates the cache, so two calls without an intervening mutation return
/// the identical box. The default containment and outline tests work on the
/// bounding box and are overridden by every shape with real geometry.
pub trait Roi {
    /// The shape's reference point (centre, start point, or first vertex).
    fn reference_point(&self) -> [f64; 2];

    /// Move the reference point, dragging the shape with it.
    fn set_reference_point(&mut self, p: [f64; 2]);

    /// Translate the whole shape.
    fn translate(&mut self, dx: f64, dy: f64);

    /// Axis-aligned bounding box (cached until the next mutation).
    fn bounds(&self) -> RectBounds;

    /// Whether the point lies inside the shape.
    ///
    /// Default: inside the bounding box.
    fn contains_point(&self, x: f64, y: f64) -> bool {
        self.bounds().contains(x, y)
    }

    /// Whether the point lies within `distance` of the shape's outline.
    ///
    /// Default: inside a copy of the bounding box inflated by `distance`.
    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        self.bounds().inflated(distance).contains(x, y)
    }

    /// Divide every length-like field (and the reference point) by `factor`,
    /// matching a detector binning step. A factor that is not positive is
    /// undefined and unchecked.
    fn downsample(&mut self, factor: f64);
}

// ── Shared geometry helpers ────────────────────────────────────────────────

/// Bit-exact coordinate-pair comparison: `NaN == NaN`, `0.0 != -0.0`.
pub(crate) fn bits_eq(a: [f64; 2], b: [f64; 2]) -> bool {
    a[0].to_bits() == b[0].to_bits() && a[1].to_bits() == b[1].to_bits()
}

/// Euclidean distance from `p` to the segment `a`–`b`.
pub(crate) fn dist_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let abx = b[0] - a[0];
    let aby = b[1] - a[1];
    let apx = p[0] - a[0];
    let apy = p[1] - a[1];
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = a[0] + t * abx;
    let cy = a[1] + t * aby;
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}

/// Identity follows the reference point, bit for bit: `NaN == NaN`,
/// `0.0 != -0.0`.
macro_rules! impl_reference_identity {
    ($($ty:ty),+ $(,)?) => {$(
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                crate::roi::bits_eq(self.reference_point(), other.reference_point())
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                let p = self.reference_point();
                state.write_u64(p[0].to_bits());
                state.write_u64(p[1].to_bits());
            }
        }
    )+};
}

impl_reference_identity!(
    PointRoi,
    LineRoi,
    PolylineRoi,
    PolygonRoi,
    RectRoi,
    CircleRoi,
    EllipseRoi,
    ParabolaRoi,
    HyperbolaRoi,
    RingRoi,
    SectorRoi,
    FittedCircleRoi,
    FittedEllipseRoi,
);

// ── Variant enum and kind registry ─────────────────────────────────────────

/// The closed set of region-of-interest variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoiShape {
    /// Single point.
    Point(PointRoi),
    /// Finite line segment.
    Line(LineRoi),
    /// Open ordered path.
    Polyline(PolylineRoi),
    /// Closed polygon.
    Polygon(PolygonRoi),
    /// Rotated rectangle.
    Rect(RectRoi),
    /// Circle.
    Circle(CircleRoi),
    /// Rotated ellipse.
    Ellipse(EllipseRoi),
    /// Parabola (open curve).
    Parabola(ParabolaRoi),
    /// Hyperbola (open curve).
    Hyperbola(HyperbolaRoi),
    /// Annulus.
    Ring(RingRoi),
    /// Annular wedge with optional symmetry mapping.
    Sector(SectorRoi),
    /// Circle kept in sync with the best fit of an owned point list.
    FittedCircle(FittedCircleRoi),
    /// Ellipse kept in sync with the best fit of an owned point list.
    FittedEllipse(FittedEllipseRoi),
}

macro_rules! for_each_variant {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            RoiShape::Point($s) => $body,
            RoiShape::Line($s) => $body,
            RoiShape::Polyline($s) => $body,
            RoiShape::Polygon($s) => $body,
            RoiShape::Rect($s) => $body,
            RoiShape::Circle($s) => $body,
            RoiShape::Ellipse($s) => $body,
            RoiShape::Parabola($s) => $body,
            RoiShape::Hyperbola($s) => $body,
            RoiShape::Ring($s) => $body,
            RoiShape::Sector($s) => $body,
            RoiShape::FittedCircle($s) => $body,
            RoiShape::FittedEllipse($s) => $body,
        }
    };
}

impl Roi for RoiShape {
    fn reference_point(&self) -> [f64; 2] {
        for_each_variant!(self, s => s.reference_point())
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        for_each_variant!(self, s => s.set_reference_point(p))
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for_each_variant!(self, s => s.translate(dx, dy))
    }

    fn bounds(&self) -> RectBounds {
        for_each_variant!(self, s => s.bounds())
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        for_each_variant!(self, s => s.contains_point(x, y))
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        for_each_variant!(self, s => s.is_near_outline(x, y, distance))
    }

    fn downsample(&mut self, factor: f64) {
        for_each_variant!(self, s => s.downsample(factor))
    }
}

impl RoiShape {
    /// Variant key of this shape.
    pub fn kind(&self) -> RoiKind {
        match self {
            Self::Point(_) => RoiKind::Point,
            Self::Line(_) => RoiKind::Line,
            Self::Polyline(_) => RoiKind::Polyline,
            Self::Polygon(_) => RoiKind::Polygon,
            Self::Rect(_) => RoiKind::Rect,
            Self::Circle(_) => RoiKind::Circle,
            Self::Ellipse(_) => RoiKind::Ellipse,
            Self::Parabola(_) => RoiKind::Parabola,
            Self::Hyperbola(_) => RoiKind::Hyperbola,
            Self::Ring(_) => RoiKind::Ring,
            Self::Sector(_) => RoiKind::Sector,
            Self::FittedCircle(_) => RoiKind::FittedCircle,
            Self::FittedEllipse(_) => RoiKind::FittedEllipse,
        }
    }
}

/// Variant key for [`RoiShape`].
///
/// Construction is a total function of the key; [`RoiKind::ALL`] enumerates
/// the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoiKind {
    /// Single point.
    Point,
    /// Finite line segment.
    Line,
    /// Open ordered path.
    Polyline,
    /// Closed polygon.
    Polygon,
    /// Rotated rectangle.
    Rect,
    /// Circle.
    Circle,
    /// Rotated ellipse.
    Ellipse,
    /// Parabola.
    Parabola,
    /// Hyperbola.
    Hyperbola,
    /// Annulus.
    Ring,
    /// Annular wedge.
    Sector,
    /// Fit-backed circle.
    FittedCircle,
    /// Fit-backed ellipse.
    FittedEllipse,
}

impl RoiKind {
    /// Every variant key, in declaration order.
    pub const ALL: [RoiKind; 13] = [
        RoiKind::Point,
        RoiKind::Line,
        RoiKind::Polyline,
        RoiKind::Polygon,
        RoiKind::Rect,
        RoiKind::Circle,
        RoiKind::Ellipse,
        RoiKind::Parabola,
        RoiKind::Hyperbola,
        RoiKind::Ring,
        RoiKind::Sector,
        RoiKind::FittedCircle,
        RoiKind::FittedEllipse,
    ];

    /// Default-construct the shape this key denotes.
    pub fn construct(self) -> RoiShape {
        match self {
            Self::Point => RoiShape::Point(PointRoi::default()),
            Self::Line => RoiShape::Line(LineRoi::default()),
            Self::Polyline => RoiShape::Polyline(PolylineRoi::default()),
            Self::Polygon => RoiShape::Polygon(PolygonRoi::default()),
            Self::Rect => RoiShape::Rect(RectRoi::default()),
            Self::Circle => RoiShape::Circle(CircleRoi::default()),
            Self::Ellipse => RoiShape::Ellipse(EllipseRoi::default()),
            Self::Parabola => RoiShape::Parabola(ParabolaRoi::default()),
            Self::Hyperbola => RoiShape::Hyperbola(HyperbolaRoi::default()),
            Self::Ring => RoiShape::Ring(RingRoi::default()),
            Self::Sector => RoiShape::Sector(SectorRoi::default()),
            Self::FittedCircle => RoiShape::FittedCircle(FittedCircleRoi::default()),
            Self::FittedEllipse => RoiShape::FittedEllipse(FittedEllipseRoi::default()),
        }
    }
}

macro_rules! impl_from_shape {
    ($($variant:ident => $ty:ty),+ $(,)?) => {$(
        impl From<$ty> for RoiShape {
            fn from(s: $ty) -> Self {
                RoiShape::$variant(s)
            }
        }
    )+};
}

impl_from_shape!(
    Point => PointRoi,
    Line => LineRoi,
    Polyline => PolylineRoi,
    Polygon => PolygonRoi,
    Rect => RectRoi,
    Circle => CircleRoi,
    Ellipse => EllipseRoi,
    Parabola => ParabolaRoi,
    Hyperbola => HyperbolaRoi,
    Ring => RingRoi,
    Sector => SectorRoi,
    FittedCircle => FittedCircleRoi,
    FittedEllipse => FittedEllipseRoi,
);
