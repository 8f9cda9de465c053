//! Homography estimation (plane-induced projective transform).
//!
//! Implements the normalized Direct Linear Transform (DLT). The homography
//! `H` maps **board points** on the plane `Z = 0` to **image points** in
//! pixels: `x' ~ H x`.
//!
//! Both point sets are normalized internally for numerical stability and the
//! output is de-normalized.

use crate::math::{collinearity_ratio, mat3_from_row_major, normalize_points_2d, solve_null_space};
use log::debug;
use nalgebra::DMatrix;
use planar_calib_core::{CorrespondenceView, Mat3, Pt2, Real};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    InsufficientPoints(usize),
    #[error("board / image point counts differ: {board} vs {image}")]
    MismatchedLengths { board: usize, image: usize },
    #[error("degenerate point configuration: {0}")]
    DegenerateGeometry(&'static str),
    #[error("svd failed")]
    SvdFailed,
}

/// Tolerances for the DLT.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomographyOptions {
    /// Point sets whose scatter eigenvalue ratio falls below this are treated
    /// as collinear; design matrices whose second-smallest singular value
    /// ratio falls below it have no unique solution.
    pub degeneracy_tol: Real,
}

impl Default for HomographyOptions {
    fn default() -> Self {
        Self {
            degeneracy_tol: 1e-10,
        }
    }
}

/// High-level entry point for homography estimation.
#[derive(Debug, Clone, Copy)]
pub struct HomographySolver;

/// Estimate `H` such that `x' ~ H x` using the normalized DLT with default
/// options.
///
/// `world` are planar points in the board frame and `image` are their pixel
/// coordinates. The returned homography is scaled so that `H[2,2] == 1`, or to
/// unit Frobenius norm when `H[2,2]` vanishes.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    HomographySolver::dlt(world, image, &HomographyOptions::default())
}

impl HomographySolver {
    /// Estimate the board → image homography of one correspondence set.
    pub fn from_view(
        view: &CorrespondenceView,
        opts: &HomographyOptions,
    ) -> Result<Mat3, HomographyError> {
        Self::dlt(&view.planar_points(), &view.points_2d, opts)
    }

    /// Estimate a homography `H` such that `x' ~ H x` using the normalized DLT.
    ///
    /// This uses Hartley-style point normalization (zero-mean, average distance
    /// sqrt(2)) and solves `A h = 0` via SVD on the `2n x 9` design matrix `A`
    /// built from `x' × (H x) = 0`.
    pub fn dlt(
        world: &[Pt2],
        image: &[Pt2],
        opts: &HomographyOptions,
    ) -> Result<Mat3, HomographyError> {
        let n = world.len();
        if image.len() != n {
            return Err(HomographyError::MismatchedLengths {
                board: n,
                image: image.len(),
            });
        }
        if n < 4 {
            return Err(HomographyError::InsufficientPoints(n));
        }

        let (world_n, t_w) = normalize_points_2d(world)
            .ok_or(HomographyError::DegenerateGeometry("board points coincide"))?;
        let (image_n, t_i) = normalize_points_2d(image)
            .ok_or(HomographyError::DegenerateGeometry("image points coincide"))?;

        if collinearity_ratio(&world_n) < opts.degeneracy_tol {
            return Err(HomographyError::DegenerateGeometry("board points are collinear"));
        }
        if collinearity_ratio(&image_n) < opts.degeneracy_tol {
            return Err(HomographyError::DegenerateGeometry("image points are collinear"));
        }

        let mut a = DMatrix::<Real>::zeros(2 * n, 9);

        for (i, (pw, pi)) in world_n.iter().zip(image_n.iter()).enumerate() {
            let x = pw.x;
            let y = pw.y;
            let u = pi.x;
            let v = pi.y;

            let r0 = 2 * i;
            let r1 = 2 * i + 1;

            a[(r0, 0)] = -x;
            a[(r0, 1)] = -y;
            a[(r0, 2)] = -1.0;
            a[(r0, 6)] = u * x;
            a[(r0, 7)] = u * y;
            a[(r0, 8)] = u;

            a[(r1, 3)] = -x;
            a[(r1, 4)] = -y;
            a[(r1, 5)] = -1.0;
            a[(r1, 6)] = v * x;
            a[(r1, 7)] = v * y;
            a[(r1, 8)] = v;
        }

        let ns = solve_null_space(&a).ok_or(HomographyError::SvdFailed)?;
        let conditioning = ns.conditioning();
        debug!("dlt: n={n} conditioning={conditioning:.3e}");
        if conditioning < opts.degeneracy_tol {
            return Err(HomographyError::DegenerateGeometry(
                "correspondences do not determine a unique homography",
            ));
        }

        let h_norm = mat3_from_row_major(&ns.vector);
        let t_i_inv = t_i.try_inverse().ok_or(HomographyError::SvdFailed)?;
        let h_mat = t_i_inv * h_norm * t_w;

        normalize_homography_scale(h_mat)
    }
}

/// Fix the free scale of `H`: `H[2,2] = 1`, or unit Frobenius norm when
/// `H[2,2]` is (numerically) zero.
fn normalize_homography_scale(h: Mat3) -> Result<Mat3, HomographyError> {
    let frob = h.norm();
    if !frob.is_finite() || frob <= Real::EPSILON {
        return Err(HomographyError::DegenerateGeometry("homography vanished"));
    }
    let h22 = h[(2, 2)];
    if h22.abs() > 1e-12 * frob {
        Ok(h / h22)
    } else {
        Ok(h / frob)
    }
}
