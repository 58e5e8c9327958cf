//! Circle and ellipse fitting.
//!
//! Two-stage pipeline:
//! 1. **Algebraic** – closed-form direct fit of implicit conic coefficients
//!    (fast, biased under noise); seeds the next stage.
//! 2. **Geometric** – iterative nonlinear least squares on true
//!    point-to-curve residuals, delegated to the external
//!    Levenberg–Marquardt optimizer with analytic Jacobians.
//!
//! The fitters report the optimized parameters plus the RMS residual.
//! Non-convergence propagates as [`FitError::ConvergenceFailure`]; nothing
//! is retried internally.

pub mod algebraic;
pub mod geometric;

mod fitted;

pub use fitted::{FittedCircleRoi, FittedEllipseRoi};

use serde::{Deserialize, Serialize};

use crate::roi::{CircleRoi, EllipseRoi};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors that can occur during circle/ellipse fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Too few points for the shape's degrees of freedom.
    InsufficientPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// The algebraic stage produced no real solution (degenerate or
    /// non-elliptical point configuration).
    NoRealSolution,
    /// The geometric refinement did not converge. Callers may retry with a
    /// different initial guess.
    ConvergenceFailure {
        /// Residual/Jacobian evaluations spent before giving up.
        evaluations: usize,
    },
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientPoints { needed, got } => {
                write!(f, "insufficient points: need {}, got {}", needed, got)
            }
            Self::NoRealSolution => write!(f, "no real solution for the algebraic fit"),
            Self::ConvergenceFailure { evaluations } => {
                write!(
                    f,
                    "geometric refinement did not converge after {} evaluations",
                    evaluations
                )
            }
        }
    }
}

impl std::error::Error for FitError {}

// ── Configuration ──────────────────────────────────────────────────────────

/// Tuning for the geometric refinement stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum optimizer iterations without improvement before giving up.
    pub patience: usize,
    /// Relative reduction tolerance on the sum of squares.
    pub ftol: f64,
    /// Relative change tolerance on the parameter vector.
    pub xtol: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            patience: 100,
            ftol: 1e-14,
            xtol: 1e-14,
        }
    }
}

// ── Fit results ────────────────────────────────────────────────────────────

/// Optimized circle parameters plus fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    /// Centre x.
    pub cx: f64,
    /// Centre y.
    pub cy: f64,
    /// Radius.
    pub radius: f64,
    /// RMS point-to-curve residual.
    pub rms: f64,
}

impl CircleFit {
    /// Geometry of this fit as a shape.
    pub fn to_roi(&self) -> CircleRoi {
        CircleRoi::new([self.cx, self.cy], self.radius)
    }
}

/// Optimized ellipse parameters plus fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseFit {
    /// Centre x.
    pub cx: f64,
    /// Centre y.
    pub cy: f64,
    /// First semi-axis.
    pub a: f64,
    /// Second semi-axis.
    pub b: f64,
    /// Rotation angle in radians.
    pub angle: f64,
    /// RMS point-to-curve residual.
    pub rms: f64,
}

impl EllipseFit {
    /// Geometry of this fit as a shape.
    pub fn to_roi(&self) -> EllipseRoi {
        EllipseRoi::new([self.cx, self.cy], self.a, self.b, self.angle)
    }

    fn from_circle(c: CircleFit) -> Self {
        Self {
            cx: c.cx,
            cy: c.cy,
            a: c.radius,
            b: c.radius,
            angle: 0.0,
            rms: c.rms,
        }
    }
}

// ── Fitters ────────────────────────────────────────────────────────────────

/// Two-stage circle fitter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircleFitter {
    config: FitConfig,
}

impl CircleFitter {
    /// Fitter with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitter with explicit tuning.
    pub fn with_config(config: FitConfig) -> Self {
        Self { config }
    }

    /// Fit a circle to the points.
    ///
    /// Exactly three points are solved directly; more go through the Pratt
    /// SVD fit. Either way the result seeds the geometric refinement.
    pub fn fit(&self, points: &[[f64; 2]]) -> Result<CircleFit, FitError> {
        let n = points.len();
        if n < 3 {
            return Err(FitError::InsufficientPoints { needed: 3, got: n });
        }
        let seed = if n == 3 {
            algebraic::circle_through_three(points)?
        } else {
            algebraic::fit_circle_pratt(points)?
        };
        geometric::refine_circle(points, seed, &self.config)
    }

    /// Fit starting from known parameters `[cx, cy, r]`, skipping the
    /// algebraic stage. Used by fit-backed shapes to warm-start re-fits.
    pub fn fit_warm(&self, points: &[[f64; 2]], seed: [f64; 3]) -> Result<CircleFit, FitError> {
        let n = points.len();
        if n < 3 {
            return Err(FitError::InsufficientPoints { needed: 3, got: n });
        }
        geometric::refine_circle(points, seed, &self.config)
    }
}

/// Two-stage ellipse fitter.
///
/// Fewer than five points cannot determine an ellipse; such requests degrade
/// to a circle fit and report equal semi-axes with zero rotation. The
/// `force_circle` switch makes that degradation unconditional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EllipseFitter {
    config: FitConfig,
    force_circle: bool,
}

impl EllipseFitter {
    /// Fitter with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitter with explicit tuning.
    pub fn with_config(config: FitConfig) -> Self {
        Self {
            config,
            force_circle: false,
        }
    }

    /// Restrict the fit to circles regardless of point count.
    pub fn force_circle(mut self, on: bool) -> Self {
        self.force_circle = on;
        self
    }

    fn circle_fitter(&self) -> CircleFitter {
        CircleFitter::with_config(self.config.clone())
    }

    /// Fit an ellipse to the points.
    pub fn fit(&self, points: &[[f64; 2]]) -> Result<EllipseFit, FitError> {
        let n = points.len();
        if n < 3 {
            return Err(FitError::InsufficientPoints { needed: 3, got: n });
        }
        if self.force_circle || n < 5 {
            return self.circle_fitter().fit(points).map(EllipseFit::from_circle);
        }
        let seed = algebraic::fit_ellipse_direct(points)?;
        geometric::refine_ellipse(points, seed, &self.config)
    }

    /// Fit starting from known parameters `[cx, cy, a, b, angle]`, skipping
    /// the algebraic stage.
    pub fn fit_warm(&self, points: &[[f64; 2]], seed: [f64; 5]) -> Result<EllipseFit, FitError> {
        let n = points.len();
        if n < 3 {
            return Err(FitError::InsufficientPoints { needed: 3, got: n });
        }
        if self.force_circle || n < 5 {
            let [cx, cy, a, b, _] = seed;
            return self
                .circle_fitter()
                .fit_warm(points, [cx, cy, 0.5 * (a + b)])
                .map(EllipseFit::from_circle);
        }
        geometric::refine_ellipse(points, seed, &self.config)
    }
}
