//! Fit-backed shapes: geometry kept in sync with the best fit of an owned
//! point list.

use serde::{Deserialize, Serialize};

use super::{CircleFit, CircleFitter, EllipseFit, EllipseFitter, FitConfig, FitError};
use crate::bbox::RectBounds;
use crate::roi::{CircleRoi, EllipseRoi, PolylineRoi, Roi};

/// A circle that tracks the best fit of an owned point list.
///
/// `set_points` re-fits and updates the embedded geometry; after the first
/// successful fit, later calls warm-start from the previous parameters. A
/// failed fit propagates its error and leaves both the points and the
/// geometry unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FittedCircleRoi {
    points: PolylineRoi,
    circle: CircleRoi,
    fit: Option<CircleFit>,
    fitter: Option<CircleFitter>,
    config: FitConfig,
}

impl FittedCircleRoi {
    /// Empty fit-backed circle with default fitter tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty fit-backed circle with explicit fitter tuning.
    pub fn with_config(config: FitConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the backing points and re-fit.
    pub fn set_points(&mut self, points: impl Into<PolylineRoi>) -> Result<(), FitError> {
        let polyline = points.into();
        let coords = polyline.to_points();

        let config = self.config.clone();
        let fitter = self
            .fitter
            .get_or_insert_with(|| CircleFitter::with_config(config));
        let fit = match self.fit {
            None => fitter.fit(&coords)?,
            Some(prev) => fitter.fit_warm(&coords, [prev.cx, prev.cy, prev.radius])?,
        };

        self.points = polyline;
        self.circle = fit.to_roi();
        self.fit = Some(fit);
        Ok(())
    }

    /// Borrowed view of the backing points.
    pub fn points(&self) -> &PolylineRoi {
        &self.points
    }

    /// Owned copy of the backing point coordinates.
    pub fn to_points(&self) -> Vec<[f64; 2]> {
        self.points.to_points()
    }

    /// The fitted circle geometry.
    pub fn circle(&self) -> &CircleRoi {
        &self.circle
    }

    /// Full parameters of the last fit, if one has run.
    pub fn last_fit(&self) -> Option<&CircleFit> {
        self.fit.as_ref()
    }

    /// RMS residual of the last fit, if one has run.
    pub fn rms(&self) -> Option<f64> {
        self.fit.map(|f| f.rms)
    }
}

impl Roi for FittedCircleRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.circle.reference_point()
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        let c = self.circle.center();
        self.translate(p[0] - c[0], p[1] - c[1]);
    }

    /// Moves the fitted geometry and the backing points together.
    fn translate(&mut self, dx: f64, dy: f64) {
        self.circle.translate(dx, dy);
        self.points.translate(dx, dy);
        if let Some(fit) = &mut self.fit {
            fit.cx += dx;
            fit.cy += dy;
        }
    }

    fn bounds(&self) -> RectBounds {
        self.circle.bounds()
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        self.circle.contains_point(x, y)
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        self.circle.is_near_outline(x, y, distance)
    }

    fn downsample(&mut self, factor: f64) {
        self.circle.downsample(factor);
        self.points.downsample(factor);
        if let Some(fit) = &mut self.fit {
            fit.cx /= factor;
            fit.cy /= factor;
            fit.radius /= factor;
            fit.rms /= factor;
        }
    }
}

/// An ellipse that tracks the best fit of an owned point list.
///
/// Point lists too small to determine an ellipse degrade to a circle fit
/// (equal semi-axes, zero rotation) with no error, matching the fitter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FittedEllipseRoi {
    points: PolylineRoi,
    ellipse: EllipseRoi,
    fit: Option<EllipseFit>,
    fitter: Option<EllipseFitter>,
    config: FitConfig,
}

impl FittedEllipseRoi {
    /// Empty fit-backed ellipse with default fitter tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty fit-backed ellipse with explicit fitter tuning.
    pub fn with_config(config: FitConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the backing points and re-fit.
    pub fn set_points(&mut self, points: impl Into<PolylineRoi>) -> Result<(), FitError> {
        let polyline = points.into();
        let coords = polyline.to_points();

        let config = self.config.clone();
        let fitter = self
            .fitter
            .get_or_insert_with(|| EllipseFitter::with_config(config));
        let fit = match self.fit {
            None => fitter.fit(&coords)?,
            Some(prev) => {
                fitter.fit_warm(&coords, [prev.cx, prev.cy, prev.a, prev.b, prev.angle])?
            }
        };

        self.points = polyline;
        self.ellipse = fit.to_roi();
        self.fit = Some(fit);
        Ok(())
    }

    /// Borrowed view of the backing points.
    pub fn points(&self) -> &PolylineRoi {
        &self.points
    }

    /// Owned copy of the backing point coordinates.
    pub fn to_points(&self) -> Vec<[f64; 2]> {
        self.points.to_points()
    }

    /// The fitted ellipse geometry.
    pub fn ellipse(&self) -> &EllipseRoi {
        &self.ellipse
    }

    /// Full parameters of the last fit, if one has run.
    pub fn last_fit(&self) -> Option<&EllipseFit> {
        self.fit.as_ref()
    }

    /// RMS residual of the last fit, if one has run.
    pub fn rms(&self) -> Option<f64> {
        self.fit.map(|f| f.rms)
    }
}

impl Roi for FittedEllipseRoi {
    fn reference_point(&self) -> [f64; 2] {
        self.ellipse.reference_point()
    }

    fn set_reference_point(&mut self, p: [f64; 2]) {
        let c = self.ellipse.center();
        self.translate(p[0] - c[0], p[1] - c[1]);
    }

    /// Moves the fitted geometry and the backing points together.
    fn translate(&mut self, dx: f64, dy: f64) {
        self.ellipse.translate(dx, dy);
        self.points.translate(dx, dy);
        if let Some(fit) = &mut self.fit {
            fit.cx += dx;
            fit.cy += dy;
        }
    }

    fn bounds(&self) -> RectBounds {
        self.ellipse.bounds()
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        self.ellipse.contains_point(x, y)
    }

    fn is_near_outline(&self, x: f64, y: f64, distance: f64) -> bool {
        self.ellipse.is_near_outline(x, y, distance)
    }

    fn downsample(&mut self, factor: f64) {
        self.ellipse.downsample(factor);
        self.points.downsample(factor);
        if let Some(fit) = &mut self.fit {
            fit.cx /= factor;
            fit.cy /= factor;
            fit.a /= factor;
            fit.b /= factor;
            fit.rms /= factor;
        }
    }
}
