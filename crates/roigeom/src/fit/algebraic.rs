//! Algebraic (direct) conic fits.
//!
//! Closed-form least-squares estimates of implicit conic coefficients used
//! to seed geometric refinement. The circle path applies Pratt
//! normalization over `[x²+y², x, y, 1]` design rows; the ellipse path is
//! the direct constrained fit of Fitzgibbon et al. (1999), with an
//! exact-conic solve for the minimal five-point case.

use nalgebra::{DMatrix, Matrix3, Matrix4, Vector3, Vector4};

use super::FitError;

// ── Circle ─────────────────────────────────────────────────────────────────

/// Circle through exactly three points, solved directly from the linear
/// system `x² + y² + d·x + e·y + f = 0` over `[x, y, 1]` rows.
///
/// Collinear points make the system singular: `NoRealSolution`.
pub fn circle_through_three(points: &[[f64; 2]]) -> Result<[f64; 3], FitError> {
    let n = points.len();
    if n != 3 {
        return Err(FitError::InsufficientPoints { needed: 3, got: n });
    }
    let m = Matrix3::new(
        points[0][0],
        points[0][1],
        1.0,
        points[1][0],
        points[1][1],
        1.0,
        points[2][0],
        points[2][1],
        1.0,
    );
    let rhs = Vector3::new(
        -(points[0][0].powi(2) + points[0][1].powi(2)),
        -(points[1][0].powi(2) + points[1][1].powi(2)),
        -(points[2][0].powi(2) + points[2][1].powi(2)),
    );
    let sol = m.lu().solve(&rhs).ok_or(FitError::NoRealSolution)?;

    let cx = -0.5 * sol[0];
    let cy = -0.5 * sol[1];
    let r2 = cx * cx + cy * cy - sol[2];
    if !r2.is_finite() || r2 <= 0.0 {
        return Err(FitError::NoRealSolution);
    }
    Ok([cx, cy, r2.sqrt()])
}

/// Pratt-normalized direct circle fit.
///
/// The point cloud is centred on its mean; the design matrix rows are
/// `[x²+y², x, y, 1]`. Among the right singular vectors (smallest singular
/// value first) the first one satisfying the Pratt constraint `vᵀCv > 0` is
/// taken as the conic `a(x²+y²) + d·x + e·y + f = 0`, from which radius and
/// centre are recovered. A negative discriminant, or a degenerate conic with
/// no finite radius, is `NoRealSolution`.
pub fn fit_circle_pratt(points: &[[f64; 2]]) -> Result<[f64; 3], FitError> {
    let n = points.len();
    if n < 3 {
        return Err(FitError::InsufficientPoints { needed: 3, got: n });
    }

    let inv_n = 1.0 / n as f64;
    let mx: f64 = points.iter().map(|p| p[0]).sum::<f64>() * inv_n;
    let my: f64 = points.iter().map(|p| p[1]).sum::<f64>() * inv_n;

    let mut design = DMatrix::<f64>::zeros(n, 4);
    for (i, p) in points.iter().enumerate() {
        let x = p[0] - mx;
        let y = p[1] - my;
        design[(i, 0)] = x * x + y * y;
        design[(i, 1)] = x;
        design[(i, 2)] = y;
        design[(i, 3)] = 1.0;
    }

    let svd = design.svd(false, true);
    let v_t = svd.v_t.ok_or(FitError::NoRealSolution)?;

    // Pratt normalization constraint: vᵀCv = d² + e² − a·f > 0.
    let c = Matrix4::new(
        0.0, 0.0, 0.0, -0.5, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        -0.5, 0.0, 0.0, 0.0,
    );

    let mut chosen = None;
    for i in (0..v_t.nrows()).rev() {
        let row = v_t.row(i);
        let v = Vector4::new(row[0], row[1], row[2], row[3]);
        let constraint = (v.transpose() * c * v)[(0, 0)];
        if constraint > 0.0 {
            chosen = Some(v);
            break;
        }
    }
    let v = chosen.ok_or(FitError::NoRealSolution)?;

    let (a, d, e, f) = (v[0], v[1], v[2], v[3]);
    let disc = d * d + e * e - 4.0 * a * f;
    if disc < 0.0 {
        return Err(FitError::NoRealSolution);
    }
    let radius = (0.5 / a).abs() * disc.sqrt();
    if !radius.is_finite() {
        return Err(FitError::NoRealSolution);
    }
    Ok([-0.5 * d / a + mx, -0.5 * e / a + my, radius])
}

// ── Ellipse ────────────────────────────────────────────────────────────────

/// Direct least-squares ellipse fit.
///
/// Six or more points go through the constrained Fitzgibbon fit; exactly
/// five points take the exact-conic path (smallest-eigenvalue direction of
/// the scatter matrix). Returns geometric parameters `[cx, cy, a, b, angle]`
/// with `a ≥ b` and the angle in `(−π/2, π/2]`.
pub fn fit_ellipse_direct(points: &[[f64; 2]]) -> Result<[f64; 5], FitError> {
    let n = points.len();
    if n < 5 {
        return Err(FitError::InsufficientPoints { needed: 5, got: n });
    }

    // Normalize for numerical stability: centre on the centroid, scale so the
    // mean distance from it is ≈ √2.
    let (mx, my, scale) = centroid_scale(points);

    let mut design = DMatrix::<f64>::zeros(n, 6);
    for (i, p) in points.iter().enumerate() {
        let x = (p[0] - mx) * scale;
        let y = (p[1] - my) * scale;
        design[(i, 0)] = x * x;
        design[(i, 1)] = x * y;
        design[(i, 2)] = y * y;
        design[(i, 3)] = x;
        design[(i, 4)] = y;
        design[(i, 5)] = 1.0;
    }

    let coeffs = if n == 5 {
        conic_through_five(&design)?
    } else {
        fitzgibbon_constrained(&design)?
    };
    let coeffs = denormalize_conic(coeffs, mx, my, scale);
    conic_to_ellipse(coeffs)
}

/// Normalization parameters `(mean_x, mean_y, scale)`.
fn centroid_scale(points: &[[f64; 2]]) -> (f64, f64, f64) {
    let inv_n = 1.0 / points.len() as f64;
    let mx: f64 = points.iter().map(|p| p[0]).sum::<f64>() * inv_n;
    let my: f64 = points.iter().map(|p| p[1]).sum::<f64>() * inv_n;

    let mean_dist: f64 = points
        .iter()
        .map(|p| ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt())
        .sum::<f64>()
        * inv_n;

    let scale = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    (mx, my, scale)
}

/// Exact conic through five points: the scatter-matrix direction with the
/// smallest eigenvalue.
fn conic_through_five(design: &DMatrix<f64>) -> Result<[f64; 6], FitError> {
    let scatter = design.transpose() * design;
    let eig = scatter.symmetric_eigen();

    let mut imin = 0;
    for i in 1..eig.eigenvalues.len() {
        if eig.eigenvalues[i] < eig.eigenvalues[imin] {
            imin = i;
        }
    }
    let v = eig.eigenvectors.column(imin);
    Ok([v[0], v[1], v[2], v[3], v[4], v[5]])
}

/// Constrained direct fit of Fitzgibbon et al. (1999).
///
/// Partitions the scatter matrix `S = DᵀD` into 3×3 blocks and reduces the
/// constrained problem to the generalized eigensystem
/// `(S11 − S12·S22⁻¹·S21)·a1 = λ·C1·a1`, with the constraint matrix `C1`
/// encoding the ellipse condition `4AC − B² > 0`.
fn fitzgibbon_constrained(design: &DMatrix<f64>) -> Result<[f64; 6], FitError> {
    let s = design.transpose() * design;

    let s11 = s.fixed_view::<3, 3>(0, 0).into_owned();
    let s12 = s.fixed_view::<3, 3>(0, 3).into_owned();
    let s22 = s.fixed_view::<3, 3>(3, 3).into_owned();

    let c1 = Matrix3::new(0.0, 0.0, 2.0, 0.0, -1.0, 0.0, 2.0, 0.0, 0.0);

    let s22_inv = s22.try_inverse().ok_or(FitError::NoRealSolution)?;
    let reduced = s11 - s12 * s22_inv * s12.transpose();

    // C1⁻¹·reduced is not symmetric, so the eigensystem goes through the
    // characteristic cubic rather than SymmetricEigen.
    let c1_inv = c1.try_inverse().ok_or(FitError::NoRealSolution)?;
    let system = c1_inv * reduced;

    let a1 = constrained_eigenvector(&system).ok_or(FitError::NoRealSolution)?;
    let a2 = -s22_inv * s12.transpose() * a1;

    Ok([a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]])
}

/// Eigenvector of the 3×3 `system` whose quadratic part satisfies the
/// ellipse constraint `4·v₀·v₂ − v₁² > 0`.
///
/// Eigenvalues come from the characteristic cubic; eigenvectors from the
/// adjugate of the shifted matrix. Of the admissible candidates the one with
/// the smallest eigenvalue magnitude wins.
fn constrained_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let a = system;
    let trace = a[(0, 0)] + a[(1, 1)] + a[(2, 2)];
    let minor_sum = a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)] + a[(0, 0)] * a[(2, 2)]
        - a[(0, 2)] * a[(2, 0)]
        + a[(1, 1)] * a[(2, 2)]
        - a[(1, 2)] * a[(2, 1)];
    let det = a.determinant();

    // Characteristic polynomial: λ³ − tr·λ² + minors·λ − det = 0.
    let eigenvalues = real_cubic_roots(-trace, minor_sum, -det);

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for ev in eigenvalues {
        let shifted = system - Matrix3::identity() * ev;
        let Some(v) = adjugate_null_vector(&shifted) else {
            continue;
        };
        if 4.0 * v[0] * v[2] - v[1] * v[1] > 0.0 {
            match best {
                Some((b, _)) if ev.abs() >= b => {}
                _ => best = Some((ev.abs(), v)),
            }
        }
    }
    best.map(|(_, v)| v)
}

/// Null vector of a (near-)singular 3×3 matrix: for a rank-2 matrix every
/// nonzero row of the adjugate is proportional to it, so the largest one is
/// taken and normalized.
fn adjugate_null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [
        Vector3::new(
            m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)],
            -(m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)]),
            m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)],
        ),
        Vector3::new(
            -(m[(0, 1)] * m[(2, 2)] - m[(0, 2)] * m[(2, 1)]),
            m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)],
            -(m[(0, 0)] * m[(2, 1)] - m[(0, 1)] * m[(2, 0)]),
        ),
        Vector3::new(
            m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)],
            -(m[(0, 0)] * m[(1, 2)] - m[(0, 2)] * m[(1, 0)]),
            m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        ),
    ];

    let mut best = &rows[0];
    let mut best_norm = best.norm_squared();
    for r in &rows[1..] {
        let n = r.norm_squared();
        if n > best_norm {
            best = r;
            best_norm = n;
        }
    }
    if best_norm < 1e-30 {
        return None;
    }
    Some(best / best_norm.sqrt())
}

/// Real roots of the monic cubic `t³ + b·t² + c·t + d = 0` (one or three).
fn real_cubic_roots(b: f64, c: f64, d: f64) -> Vec<f64> {
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;

    let disc = -4.0 * p * p * p - 27.0 * q * q;
    if disc >= 0.0 {
        // Three real roots (possibly repeated): trigonometric form.
        let r = (-p / 3.0).sqrt();
        let cos_arg = if r.abs() < 1e-15 {
            0.0
        } else {
            (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0)
        };
        let theta = cos_arg.acos();
        let two_r = 2.0 * r;
        (0..3)
            .map(|k| {
                two_r * ((theta + 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos() + shift
            })
            .collect()
    } else {
        // One real root: Cardano.
        let sqrt_disc = (q * q / 4.0 + p * p * p / 27.0).sqrt();
        let u = (-q / 2.0 + sqrt_disc).cbrt();
        let v = (-q / 2.0 - sqrt_disc).cbrt();
        vec![u + v + shift]
    }
}

/// Undo the centroid/scale normalization of conic coefficients: substitute
/// `x' = s(x − mx)`, `y' = s(y − my)` back into
/// `A'x'² + B'x'y' + C'y'² + D'x' + E'y' + F' = 0`.
fn denormalize_conic(c: [f64; 6], mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = c;
    let s2 = s * s;

    let a = a_ * s2;
    let b = b_ * s2;
    let cc = c_ * s2;
    let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
    let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
    let f =
        a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;

    [a, b, cc, d, e, f]
}

/// Geometric ellipse parameters `[cx, cy, a, b, angle]` from general conic
/// coefficients `A x² + B xy + C y² + D x + E y + F = 0`.
///
/// Anything that is not a proper finite ellipse is `NoRealSolution`.
pub(crate) fn conic_to_ellipse(coeffs: [f64; 6]) -> Result<[f64; 5], FitError> {
    let [a, b, c, d, e, f] = coeffs;

    let disc = b * b - 4.0 * a * c;
    if disc >= 0.0 {
        return Err(FitError::NoRealSolution);
    }

    // Centre from the gradient zero:
    //   2A·cx + B·cy + D = 0
    //   B·cx + 2C·cy + E = 0
    let denom = 4.0 * a * c - b * b; // = −disc > 0
    let cx = (b * e - 2.0 * c * d) / denom;
    let cy = (b * d - 2.0 * a * e) / denom;

    let angle = if (a - c).abs() < 1e-15 {
        if b > 0.0 {
            std::f64::consts::FRAC_PI_4
        } else if b < 0.0 {
            -std::f64::consts::FRAC_PI_4
        } else {
            0.0
        }
    } else {
        0.5 * b.atan2(a - c)
    };

    // Semi-axes from the eigenvalues of the quadratic part.
    let sum = a + c;
    let diff = ((a - c).powi(2) + b * b).sqrt();
    let lambda1 = 0.5 * (sum + diff);
    let lambda2 = 0.5 * (sum - diff);

    // Conic value at the centre.
    let f_centre = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
    if f_centre.abs() < 1e-15 {
        return Err(FitError::NoRealSolution);
    }

    let a_sq = -f_centre / lambda1;
    let b_sq = -f_centre / lambda2;
    if a_sq <= 0.0 || b_sq <= 0.0 {
        return Err(FitError::NoRealSolution);
    }

    let (mut semi_a, mut semi_b) = (a_sq.sqrt(), b_sq.sqrt());
    let mut angle = angle;
    if semi_a < semi_b {
        std::mem::swap(&mut semi_a, &mut semi_b);
        angle += std::f64::consts::FRAC_PI_2;
    }

    // Normalize the axis angle into (−π/2, π/2].
    let pi = std::f64::consts::PI;
    while angle > pi / 2.0 {
        angle -= pi;
    }
    while angle <= -pi / 2.0 {
        angle += pi;
    }

    Ok([cx, cy, semi_a, semi_b, angle])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::{CircleRoi, EllipseRoi};
    use approx::assert_relative_eq;
    use rand::prelude::*;

    #[test]
    fn pratt_recovers_exact_circle() {
        let truth = CircleRoi::new([120.0, 95.0], 37.0);
        let seed = fit_circle_pratt(&truth.sample_points(20)).expect("fit should succeed");
        assert_relative_eq!(seed[0], 120.0, epsilon = 1e-9);
        assert_relative_eq!(seed[1], 95.0, epsilon = 1e-9);
        assert_relative_eq!(seed[2], 37.0, epsilon = 1e-9);
    }

    #[test]
    fn pratt_survives_moderate_noise() {
        let truth = CircleRoi::new([50.0, 60.0], 20.0);
        let mut pts = truth.sample_points(200);
        let mut rng = StdRng::seed_from_u64(7);
        for p in &mut pts {
            p[0] += (rng.gen::<f64>() - 0.5) * 1.0;
            p[1] += (rng.gen::<f64>() - 0.5) * 1.0;
        }
        let seed = fit_circle_pratt(&pts).expect("noisy fit should succeed");
        assert_relative_eq!(seed[0], 50.0, epsilon = 0.5);
        assert_relative_eq!(seed[1], 60.0, epsilon = 0.5);
        assert_relative_eq!(seed[2], 20.0, epsilon = 0.5);
    }

    #[test]
    fn pratt_rejects_collinear_points() {
        let pts: Vec<[f64; 2]> = (0..8).map(|i| [i as f64, 2.0 * i as f64]).collect();
        assert_eq!(fit_circle_pratt(&pts), Err(FitError::NoRealSolution));
    }

    #[test]
    fn three_point_solve_and_its_failure_modes() {
        let truth = CircleRoi::new([-3.0, 9.0], 6.0);
        let pts = truth.sample_points(3);
        let seed = circle_through_three(&pts).expect("three-point solve should succeed");
        assert_relative_eq!(seed[0], -3.0, epsilon = 1e-9);
        assert_relative_eq!(seed[1], 9.0, epsilon = 1e-9);
        assert_relative_eq!(seed[2], 6.0, epsilon = 1e-9);

        let collinear = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        assert_eq!(circle_through_three(&collinear), Err(FitError::NoRealSolution));

        assert_eq!(
            circle_through_three(&pts[..2]),
            Err(FitError::InsufficientPoints { needed: 3, got: 2 })
        );
    }

    #[test]
    fn direct_fit_recovers_exact_ellipse() {
        let truth = EllipseRoi::new([100.0, 80.0], 30.0, 15.0, 0.3);
        let p = fit_ellipse_direct(&truth.sample_points(50)).expect("fit should succeed");
        assert_relative_eq!(p[0], 100.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], 80.0, epsilon = 1e-6);
        assert_relative_eq!(p[2], 30.0, epsilon = 1e-6);
        assert_relative_eq!(p[3], 15.0, epsilon = 1e-6);
        assert_relative_eq!(p[4], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn five_points_take_the_exact_path() {
        let truth = EllipseRoi::new([10.0, 10.0], 8.0, 5.0, -0.4);
        let pts = truth.sample_points(5);
        let p = fit_ellipse_direct(&pts).expect("five-point fit should succeed");
        assert_relative_eq!(p[0], 10.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], 10.0, epsilon = 1e-6);
        assert_relative_eq!(p[2], 8.0, epsilon = 1e-6);
        assert_relative_eq!(p[3], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn various_orientations_round_trip() {
        let cases = [
            EllipseRoi::new([50.0, 50.0], 40.0, 10.0, 0.0),
            EllipseRoi::new([200.0, 150.0], 25.0, 24.0, 1.0),
            EllipseRoi::new([300.0, 100.0], 50.0, 20.0, -0.7),
            EllipseRoi::new([10.0, 10.0], 8.0, 5.0, std::f64::consts::FRAC_PI_4),
        ];
        for (i, truth) in cases.iter().enumerate() {
            let p = fit_ellipse_direct(&truth.sample_points(100))
                .unwrap_or_else(|e| panic!("fit should succeed for case {}: {}", i, e));
            assert_relative_eq!(p[0], truth.center()[0], epsilon = 1e-4);
            assert_relative_eq!(p[1], truth.center()[1], epsilon = 1e-4);
            assert_relative_eq!(p[2], truth.semi_axes()[0], epsilon = 1e-4);
            assert_relative_eq!(p[3], truth.semi_axes()[1], epsilon = 1e-4);
        }
    }

    #[test]
    fn degenerate_inputs_do_not_panic() {
        // Collinear.
        let line: Vec<[f64; 2]> = (0..6).map(|i| [10.0 * i as f64, 0.0]).collect();
        assert!(fit_ellipse_direct(&line).is_err());

        // All-duplicate cloud.
        let dup = vec![[1.0, 1.0]; 10];
        assert!(fit_ellipse_direct(&dup).is_err());

        // Too few.
        assert_eq!(
            fit_ellipse_direct(&dup[..4]),
            Err(FitError::InsufficientPoints { needed: 5, got: 4 })
        );
    }

    #[test]
    fn conic_round_trip_through_geometric_form() {
        // Build conic coefficients from a known ellipse, recover parameters.
        let (cx, cy, sa, sb, ang) = (3.0_f64, -2.0_f64, 5.0_f64, 2.0_f64, 0.6_f64);
        let (cos_a, sin_a) = (ang.cos(), ang.sin());
        let (a2, b2) = (sa * sa, sb * sb);
        let ca = cos_a * cos_a / a2 + sin_a * sin_a / b2;
        let cb = 2.0 * cos_a * sin_a * (1.0 / a2 - 1.0 / b2);
        let cc = sin_a * sin_a / a2 + cos_a * cos_a / b2;
        let cd = -2.0 * ca * cx - cb * cy;
        let ce = -cb * cx - 2.0 * cc * cy;
        let cf = ca * cx * cx + cb * cx * cy + cc * cy * cy - 1.0;

        let p = conic_to_ellipse([ca, cb, cc, cd, ce, cf]).expect("proper ellipse");
        assert_relative_eq!(p[0], cx, epsilon = 1e-10);
        assert_relative_eq!(p[1], cy, epsilon = 1e-10);
        assert_relative_eq!(p[2], sa, epsilon = 1e-10);
        assert_relative_eq!(p[3], sb, epsilon = 1e-10);
        assert_relative_eq!(p[4], ang, epsilon = 1e-10);
    }

    #[test]
    fn hyperbola_coefficients_are_rejected() {
        // x² − y² − 1 = 0 has a non-negative discriminant.
        assert_eq!(
            conic_to_ellipse([1.0, 0.0, -1.0, 0.0, 0.0, -1.0]),
            Err(FitError::NoRealSolution)
        );
    }
}
