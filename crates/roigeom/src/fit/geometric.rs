//! Geometric conic refinement.
//!
//! Re-expresses every data point as a point on the candidate curve at its
//! own parametric angle, then minimizes the sum of squared model-minus-data
//! components with the external Levenberg–Marquardt optimizer. The parameter
//! vector is the shape parameters followed by one angle per point; the
//! Jacobian is analytic, not finite-differenced.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

use super::{CircleFit, EllipseFit, FitConfig, FitError};
use crate::orient::Orientation;

fn optimizer(config: &FitConfig) -> LevenbergMarquardt<f64> {
    LevenbergMarquardt::new()
        .with_patience(config.patience)
        .with_ftol(config.ftol)
        .with_xtol(config.xtol)
}

/// RMS point-to-curve residual from the optimizer's final objective
/// (`objective = ½·Σ‖model − data‖²` over `n` points).
fn rms_from_objective(objective: f64, n: usize) -> f64 {
    (2.0 * objective / n as f64).sqrt()
}

// ── Circle ─────────────────────────────────────────────────────────────────

/// Circle residual model: parameters `[cx, cy, r, θ₁ .. θₙ]`, residuals the
/// `2n` components of `(cx + r·cosθᵢ − xᵢ, cy + r·sinθᵢ − yᵢ)`.
struct CircleProblem<'a> {
    points: &'a [[f64; 2]],
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for CircleProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let (cx, cy, r) = (self.params[0], self.params[1], self.params[2]);
        let mut res = DVector::zeros(2 * self.points.len());
        for (i, p) in self.points.iter().enumerate() {
            let (st, ct) = self.params[3 + i].sin_cos();
            res[2 * i] = cx + r * ct - p[0];
            res[2 * i + 1] = cy + r * st - p[1];
        }
        Some(res)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let n = self.points.len();
        let r = self.params[2];
        let mut jac = DMatrix::zeros(2 * n, 3 + n);
        for i in 0..n {
            let (st, ct) = self.params[3 + i].sin_cos();
            jac[(2 * i, 0)] = 1.0;
            jac[(2 * i, 2)] = ct;
            jac[(2 * i, 3 + i)] = -r * st;
            jac[(2 * i + 1, 1)] = 1.0;
            jac[(2 * i + 1, 2)] = st;
            jac[(2 * i + 1, 3 + i)] = r * ct;
        }
        Some(jac)
    }
}

/// Refine a circle from the seed `[cx, cy, r]`.
///
/// Initial per-point angles come from `atan2` about the seed centre.
pub(crate) fn refine_circle(
    points: &[[f64; 2]],
    seed: [f64; 3],
    config: &FitConfig,
) -> Result<CircleFit, FitError> {
    let n = points.len();
    let mut params = DVector::zeros(3 + n);
    params[0] = seed[0];
    params[1] = seed[1];
    params[2] = seed[2];
    for (i, p) in points.iter().enumerate() {
        params[3 + i] = (p[1] - seed[1]).atan2(p[0] - seed[0]);
    }

    let problem = CircleProblem { points, params };
    let (solved, report) = optimizer(config).minimize(problem);
    if !report.termination.was_successful() {
        return Err(FitError::ConvergenceFailure {
            evaluations: report.number_of_evaluations,
        });
    }

    let p = &solved.params;
    Ok(CircleFit {
        cx: p[0],
        cy: p[1],
        radius: p[2].abs(),
        rms: rms_from_objective(report.objective_function, n),
    })
}

// ── Ellipse ────────────────────────────────────────────────────────────────

/// Ellipse residual model: parameters `[cx, cy, a, b, φ, θ₁ .. θₙ]`, model
/// points `centre + R(φ)·(a·cosθᵢ, b·sinθᵢ)`.
struct EllipseProblem<'a> {
    points: &'a [[f64; 2]],
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for EllipseProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let (cx, cy, a, b) = (
            self.params[0],
            self.params[1],
            self.params[2],
            self.params[3],
        );
        let (sp, cp) = self.params[4].sin_cos();
        let mut res = DVector::zeros(2 * self.points.len());
        for (i, p) in self.points.iter().enumerate() {
            let (st, ct) = self.params[5 + i].sin_cos();
            res[2 * i] = cx + a * cp * ct - b * sp * st - p[0];
            res[2 * i + 1] = cy + a * sp * ct + b * cp * st - p[1];
        }
        Some(res)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let n = self.points.len();
        let (a, b) = (self.params[2], self.params[3]);
        let (sp, cp) = self.params[4].sin_cos();
        let mut jac = DMatrix::zeros(2 * n, 5 + n);
        for i in 0..n {
            let (st, ct) = self.params[5 + i].sin_cos();

            jac[(2 * i, 0)] = 1.0;
            jac[(2 * i, 2)] = cp * ct;
            jac[(2 * i, 3)] = -sp * st;
            jac[(2 * i, 4)] = -a * sp * ct - b * cp * st;
            jac[(2 * i, 5 + i)] = -a * cp * st - b * sp * ct;

            jac[(2 * i + 1, 1)] = 1.0;
            jac[(2 * i + 1, 2)] = sp * ct;
            jac[(2 * i + 1, 3)] = cp * st;
            jac[(2 * i + 1, 4)] = a * cp * ct - b * sp * st;
            jac[(2 * i + 1, 5 + i)] = -a * sp * st + b * cp * ct;
        }
        Some(jac)
    }
}

/// Refine an ellipse from the seed `[cx, cy, a, b, angle]`.
pub(crate) fn refine_ellipse(
    points: &[[f64; 2]],
    seed: [f64; 5],
    config: &FitConfig,
) -> Result<EllipseFit, FitError> {
    let n = points.len();
    let mut params = DVector::zeros(5 + n);
    for (i, &s) in seed.iter().enumerate() {
        params[i] = s;
    }
    for (i, p) in points.iter().enumerate() {
        params[5 + i] = (p[1] - seed[1]).atan2(p[0] - seed[0]);
    }

    let problem = EllipseProblem { points, params };
    let (solved, report) = optimizer(config).minimize(problem);
    if !report.termination.was_successful() {
        return Err(FitError::ConvergenceFailure {
            evaluations: report.number_of_evaluations,
        });
    }

    let p = &solved.params;
    Ok(EllipseFit {
        cx: p[0],
        cy: p[1],
        a: p[2].abs(),
        b: p[3].abs(),
        angle: Orientation::new(p[4]).angle(),
        rms: rms_from_objective(report.objective_function, n),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::{CircleRoi, EllipseRoi, Roi};
    use approx::assert_relative_eq;
    use rand::prelude::*;

    #[test]
    fn circle_refinement_sharpens_a_rough_seed() {
        let truth = CircleRoi::new([40.0, 25.0], 9.0);
        let pts = truth.sample_points(16);
        let fit = refine_circle(&pts, [41.5, 23.8, 7.0], &FitConfig::default())
            .expect("refinement should converge");
        assert_relative_eq!(fit.cx, 40.0, epsilon = 1e-8);
        assert_relative_eq!(fit.cy, 25.0, epsilon = 1e-8);
        assert_relative_eq!(fit.radius, 9.0, epsilon = 1e-8);
        assert!(fit.rms < 1e-10);
    }

    #[test]
    fn circle_refinement_is_unbiased_under_noise() {
        let truth = CircleRoi::new([0.0, 0.0], 10.0);
        let mut pts = truth.sample_points(256);
        let mut rng = StdRng::seed_from_u64(99);
        for p in &mut pts {
            p[0] += (rng.gen::<f64>() - 0.5) * 0.2;
            p[1] += (rng.gen::<f64>() - 0.5) * 0.2;
        }
        let fit = refine_circle(&pts, [0.3, -0.2, 9.5], &FitConfig::default())
            .expect("noisy refinement should converge");
        assert_relative_eq!(fit.cx, 0.0, epsilon = 0.05);
        assert_relative_eq!(fit.cy, 0.0, epsilon = 0.05);
        assert_relative_eq!(fit.radius, 10.0, epsilon = 0.05);
        // RMS reflects the injected noise scale.
        assert!(fit.rms > 0.01 && fit.rms < 0.1, "rms {}", fit.rms);
    }

    #[test]
    fn ellipse_refinement_recovers_all_five_parameters() {
        let truth = EllipseRoi::new([-12.0, 33.0], 14.0, 6.0, 0.4);
        let pts = truth.sample_points(24);
        let fit = refine_ellipse(&pts, [-11.0, 34.0, 13.0, 7.0, 0.3], &FitConfig::default())
            .expect("refinement should converge");
        assert_relative_eq!(fit.cx, -12.0, epsilon = 1e-6);
        assert_relative_eq!(fit.cy, 33.0, epsilon = 1e-6);
        assert_relative_eq!(fit.a, 14.0, epsilon = 1e-6);
        assert_relative_eq!(fit.b, 6.0, epsilon = 1e-6);
        assert_relative_eq!(fit.angle, 0.4, epsilon = 1e-6);
        assert!(fit.rms < 1e-8);
    }

    #[test]
    fn refined_geometry_passes_outline_checks() {
        let truth = EllipseRoi::new([5.0, 5.0], 9.0, 4.0, 1.1);
        let pts = truth.sample_points(32);
        let fit = refine_ellipse(&pts, [5.5, 4.5, 8.0, 5.0, 1.0], &FitConfig::default())
            .expect("refinement should converge");
        let roi = fit.to_roi();
        for p in &pts {
            assert!(roi.is_near_outline(p[0], p[1], 1e-6));
        }
    }
}
