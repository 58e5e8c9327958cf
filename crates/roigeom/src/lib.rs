//! roigeom — regions of interest over 2D detector images.
//!
//! Two halves:
//!
//! 1. **Shapes** – a closed family of ROI variants (point, line, polyline,
//!    polygon, rotated rectangle, circle, ellipse, parabola, hyperbola,
//!    ring, sector) behind the common [`Roi`] capability trait: reference
//!    point, lazily cached bounds, containment, outline proximity, copy and
//!    downsampling. Conic shapes additionally evaluate boundary points at a
//!    parametric angle; sectors map their wedge through a symmetry rule.
//! 2. **Fitting** – circle/ellipse estimation from a point cloud: an
//!    algebraic direct fit (Pratt / Fitzgibbon) seeds a geometric
//!    refinement run through an external Levenberg–Marquardt optimizer with
//!    analytic Jacobians. Fit-backed shapes own their point list and keep
//!    their geometry synced to the best fit.
//!
//! Everything is synchronous and single-threaded; shapes assume a single
//! writer, and an immutable value copy is safe to hand to another thread.
//! Higher-level concerns (sector integration, masking, pixel I/O, overlay
//! rendering) live in external consumers of this query surface.

mod bbox;
mod orient;

pub mod fit;
pub mod roi;

pub use bbox::{BoundsCache, RectBounds};
pub use orient::Orientation;

pub use roi::{
    CircleRoi, EllipseRoi, HyperbolaRoi, LineRoi, ParabolaRoi, PointRoi, PolygonRoi, PolylineRoi,
    RectRoi, RingRoi, Roi, RoiError, RoiKind, RoiShape, SectorRoi, SectorSymmetry,
};

pub use fit::{
    CircleFit, CircleFitter, EllipseFit, EllipseFitter, FitConfig, FitError, FittedCircleRoi,
    FittedEllipseRoi,
};
