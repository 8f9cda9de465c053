//! Mathematical utilities shared by the linear solvers.
//!
//! - **Hartley normalization** of 2D points (numerical conditioning),
//! - **null-space extraction** via SVD, with the singular spectrum needed to
//!   judge whether the solution is unique,
//! - **collinearity measure** for planar point sets.
//!
//! # Example
//!
//! ```
//! use planar_calib_linear::math::normalize_points_2d;
//! use planar_calib_core::Pt2;
//!
//! let points = vec![
//!     Pt2::new(100.0, 200.0),
//!     Pt2::new(150.0, 250.0),
//!     Pt2::new(120.0, 220.0),
//! ];
//!
//! let (normalized, transform) = normalize_points_2d(&points).unwrap();
//! // normalized points have mean at origin, mean distance = sqrt(2)
//! # let _ = (normalized, transform);
//! ```

use nalgebra::{DMatrix, DVector};
use planar_calib_core::{Mat3, Pt2, Real};

/// Hartley normalization for 2D points.
///
/// Centers points at the origin and scales so that the mean distance from
/// the origin is `√2`.
///
/// Returns the normalized points and the 3x3 transform `T` such that
/// `p_norm = T * p_homogeneous`, or `None` if the input is empty or all points
/// coincide (zero mean distance).
///
/// # References
///
/// Hartley & Zisserman, "Multiple View Geometry in Computer Vision", 2nd ed.,
/// Algorithm 4.2 (Normalized DLT)
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as Real;
    let (cx, cy) = centroid(points);

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<Real>()
        / n;

    if !mean_dist.is_finite() || mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = (2.0 as Real).sqrt() / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    );

    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();

    Some((norm, t))
}

fn centroid(points: &[Pt2]) -> (Real, Real) {
    let n = points.len() as Real;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    (sx / n, sy / n)
}

/// Ratio `λ_min / λ_max` of the centered 2x2 scatter matrix of `points`.
///
/// `0` means all points lie on a single line (or coincide); `1` means the
/// spread is isotropic. Fewer than two points yield `0`.
pub fn collinearity_ratio(points: &[Pt2]) -> Real {
    if points.len() < 2 {
        return 0.0;
    }
    let (cx, cy) = centroid(points);
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // Closed-form eigenvalues of a symmetric 2x2 matrix.
    let half_trace = 0.5 * (sxx + syy);
    let disc = (0.25 * (sxx - syy).powi(2) + sxy * sxy).sqrt();
    let l_max = half_trace + disc;
    let l_min = (half_trace - disc).max(0.0);
    if l_max <= Real::EPSILON {
        return 0.0;
    }
    l_min / l_max
}

/// Least-squares null vector of a homogeneous system `A x = 0`.
#[derive(Debug, Clone)]
pub struct NullSpace {
    /// Unit-norm right singular vector for the smallest singular value.
    pub vector: DVector<Real>,
    /// Singular values sorted in descending order.
    pub singular_values: Vec<Real>,
}

impl NullSpace {
    /// Ratio of the second-smallest to the largest singular value.
    ///
    /// A value near zero means the null space is more than one-dimensional,
    /// i.e. the constraints do not determine a unique solution.
    pub fn conditioning(&self) -> Real {
        let n = self.singular_values.len();
        if n < 2 || self.singular_values[0] <= 0.0 {
            return 0.0;
        }
        self.singular_values[n - 2] / self.singular_values[0]
    }
}

/// Solve `A x = 0` for `‖x‖ = 1` via SVD.
///
/// Systems with fewer rows than columns are zero-padded to square so that the
/// full right singular basis is available. Returns `None` if the
/// decomposition does not produce `Vᵀ`.
pub fn solve_null_space(a: &DMatrix<Real>) -> Option<NullSpace> {
    let (rows, cols) = a.shape();
    let a_work = if rows < cols {
        let mut a_pad = DMatrix::<Real>::zeros(cols, cols);
        a_pad.view_mut((0, 0), (rows, cols)).copy_from(a);
        a_pad
    } else {
        a.clone()
    };

    let svd = a_work.svd(false, true);
    let v_t = svd.v_t?;

    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|(_, x), (_, y)| x.total_cmp(y))?;
    let vector = v_t.row(min_idx).transpose();

    let mut singular_values: Vec<Real> = svd.singular_values.iter().copied().collect();
    singular_values.sort_by(|x, y| y.total_cmp(x));

    Some(NullSpace {
        vector,
        singular_values,
    })
}

/// Reshape a 9-vector (row-major) into a 3x3 matrix.
pub fn mat3_from_row_major(v: &DVector<Real>) -> Mat3 {
    debug_assert_eq!(v.len(), 9, "expected 9 entries for a 3x3 matrix");
    let mut m = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            m[(r, c)] = v[3 * r + c];
        }
    }
    m
}
