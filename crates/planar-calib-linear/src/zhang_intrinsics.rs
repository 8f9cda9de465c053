//! Zhang's closed-form intrinsics from plane homographies.
//!
//! Every board → image homography `H = λ K [r1 r2 t]` yields two linear
//! constraints on the symmetric matrix `B = K⁻ᵀ K⁻¹`:
//!
//! ```text
//! h1ᵀ B h2 = 0
//! h1ᵀ B h1 = h2ᵀ B h2
//! ```
//!
//! Stacking them for all views gives `V b = 0` over the six unique entries
//! `b = (B11, B12, B22, B13, B23, B33)`; `K` is then recovered from `b` in
//! closed form.
//!
//! # References
//!
//! Z. Zhang, "A Flexible New Technique for Camera Calibration", TPAMI 2000.

use crate::math::solve_null_space;
use log::debug;
use nalgebra::{DMatrix, SVector};
use planar_calib_core::{FxFyCxCySkew, Mat3, Real};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntrinsicsError {
    #[error("need at least 3 independent homographies ({views} given): {detail}")]
    Underconstrained { views: usize, detail: &'static str },
    #[error("intrinsic system has no stable solution: {0}")]
    SingularSystem(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZhangOptions {
    /// Minimum ratio of the second-smallest to the largest singular value of
    /// `V`; below it the views are treated as dependent.
    pub rank_tol: Real,
    /// Add the constraint `B12 = 0`, i.e. force zero skew.
    pub zero_skew: bool,
}

impl Default for ZhangOptions {
    fn default() -> Self {
        Self {
            rank_tol: 1e-9,
            zero_skew: false,
        }
    }
}

/// Build the 6-vector `v_ij(H)` such that `h_iᵀ B h_j = v_ijᵀ b`.
fn v_ij(hmtx: &Mat3, i: usize, j: usize) -> SVector<Real, 6> {
    let hi = hmtx.column(i);
    let hj = hmtx.column(j);

    SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Pixel scale used to condition the homographies before stacking.
///
/// Rows 0 and 1 of `H` carry focal-length-sized entries while row 2 carries
/// rotation/depth-sized ones; their norm ratio approximates the image scale.
fn pixel_scale(hmtxs: &[Mat3]) -> Real {
    let ratios: Vec<Real> = hmtxs
        .iter()
        .filter_map(|h| {
            let top = 0.5 * (h.row(0).norm() + h.row(1).norm());
            let bottom = h.row(2).norm();
            let r = top / bottom;
            (r.is_finite() && r > 0.0).then_some(r)
        })
        .collect();
    if ratios.is_empty() {
        return 1.0;
    }
    let mean = ratios.iter().sum::<Real>() / ratios.len() as Real;
    if mean.is_finite() && mean > Real::EPSILON {
        mean
    } else {
        1.0
    }
}

/// Closed-form intrinsics solver.
#[derive(Debug, Clone, Copy)]
pub struct ZhangIntrinsicsSolver;

/// Estimate camera intrinsics K from a set of plane homographies using
/// Zhang's closed-form solution (no distortion) with default options.
///
/// Requires at least 3 homographies from views with different orientations.
pub fn estimate_intrinsics_from_homographies(
    hmtxs: &[Mat3],
) -> Result<FxFyCxCySkew<Real>, IntrinsicsError> {
    ZhangIntrinsicsSolver::solve(hmtxs, &ZhangOptions::default())
}

impl ZhangIntrinsicsSolver {
    pub fn solve(
        hmtxs: &[Mat3],
        opts: &ZhangOptions,
    ) -> Result<FxFyCxCySkew<Real>, IntrinsicsError> {
        let m = hmtxs.len();
        if m < 3 {
            return Err(IntrinsicsError::Underconstrained {
                views: m,
                detail: "too few views",
            });
        }

        // Work with H' = T H for T = diag(1/s, 1/s, 1); then K = T⁻¹ K'.
        let s = pixel_scale(hmtxs);
        let t = Mat3::new(1.0 / s, 0.0, 0.0, 0.0, 1.0 / s, 0.0, 0.0, 0.0, 1.0);

        let extra_rows = usize::from(opts.zero_skew);
        let mut vmtx = DMatrix::<Real>::zeros(2 * m + extra_rows, 6);

        for (k, hmtx) in hmtxs.iter().enumerate() {
            let h = t * hmtx;
            let norm = h.norm();
            if !norm.is_finite() || norm <= Real::EPSILON {
                return Err(IntrinsicsError::SingularSystem("zero homography"));
            }
            let h = h / norm;

            let v11 = v_ij(&h, 0, 0);
            let v22 = v_ij(&h, 1, 1);
            let v12 = v_ij(&h, 0, 1);

            vmtx.row_mut(2 * k).copy_from(&v12.transpose());
            vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
        }
        if opts.zero_skew {
            vmtx[(2 * m, 1)] = 1.0;
        }

        let ns = solve_null_space(&vmtx)
            .ok_or(IntrinsicsError::SingularSystem("svd failed"))?;
        let conditioning = ns.conditioning();
        debug!("zhang: views={m} pixel_scale={s:.3} conditioning={conditioning:.3e}");
        if conditioning < opts.rank_tol {
            return Err(IntrinsicsError::Underconstrained {
                views: m,
                detail: "homographies are not independent (views share orientation)",
            });
        }

        let b = &ns.vector;
        let k_scaled = intrinsics_from_b([b[0], b[1], b[2], b[3], b[4], b[5]])?;

        let intr = FxFyCxCySkew {
            fx: k_scaled.fx * s,
            fy: k_scaled.fy * s,
            cx: k_scaled.cx * s,
            cy: k_scaled.cy * s,
            skew: k_scaled.skew * s,
        };
        if !intr.is_valid() {
            return Err(IntrinsicsError::SingularSystem(
                "non-finite or non-positive focal length",
            ));
        }
        Ok(intr)
    }
}

/// Closed-form back-substitution of `K` from `b = (B11, B12, B22, B13, B23, B33)`.
///
/// ```text
/// v0 = (B12 B13 - B11 B23) / (B11 B22 - B12^2)
/// λ  = B33 - (B13^2 + v0 (B12 B13 - B11 B23)) / B11
/// α  = sqrt(λ / B11)
/// β  = sqrt(λ B11 / (B11 B22 - B12^2))
/// γ  = -B12 α^2 β / λ
/// u0 = γ v0 / β - B13 α^2 / λ
/// ```
///
/// The result is invariant to the sign of `b`.
fn intrinsics_from_b(b: [Real; 6]) -> Result<FxFyCxCySkew<Real>, IntrinsicsError> {
    let [b11, b12, b22, b13, b23, b33] = b;

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    let denom_rel = if denom_norm > 0.0 {
        denom.abs() / denom_norm
    } else {
        0.0
    };
    if denom_rel <= 1e-12 || b11.abs() <= Real::EPSILON {
        return Err(IntrinsicsError::SingularSystem(
            "degenerate configuration (B11 B22 - B12^2 ~ 0)",
        ));
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    let alpha_sq = lambda / b11;
    let beta_sq = lambda * b11 / denom;
    if !(alpha_sq > 0.0 && beta_sq > 0.0) {
        return Err(IntrinsicsError::SingularSystem(
            "B is not definite; focal lengths would be imaginary",
        ));
    }

    let alpha = alpha_sq.sqrt();
    let beta = beta_sq.sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(FxFyCxCySkew {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
    })
}
