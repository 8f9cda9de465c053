//! Planar pose estimation from a homography.
//!
//! Decomposes a plane-induced homography into a pose `T_C_B` given intrinsics
//! `K`, assuming the board lies on `Z = 0` in its own coordinates.

use nalgebra::{Matrix3, Rotation3};
use planar_calib_core::{Extrinsics, Mat3, Real, Vec3};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error("invalid pose: {0}")]
    InvalidPose(&'static str),
    #[error("svd failed during planar pose extraction")]
    SvdFailed,
}

/// Linear pose initialisation from a homography and intrinsics.
///
/// This implements the classic decomposition of a plane-induced homography
/// `H` into a rotation and translation, assuming the target lies on the plane
/// `Z = 0` in its own coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPoseSolver;

/// Estimate pose of a planar board (Z = 0) relative to camera, given intrinsics
/// `K` and homography `H` (plane -> image).
pub fn estimate_planar_pose_from_h(kmtx: &Mat3, hmtx: &Mat3) -> Result<Extrinsics, PoseError> {
    PlanarPoseSolver::from_homography(kmtx, hmtx)
}

impl PlanarPoseSolver {
    /// Decompose a homography into a pose `T_C_B` given intrinsics `K`.
    ///
    /// With `M = K⁻¹ H`, the first two columns of `M` are the first two
    /// rotation columns scaled by a common factor, taken as their mean norm.
    /// The third rotation column is their cross product and the result is
    /// projected onto SO(3). The overall sign is chosen so the board lies in
    /// front of the camera (`t.z > 0`).
    pub fn from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Extrinsics, PoseError> {
        let k_inv = kmtx.try_inverse().ok_or(PoseError::SingularIntrinsics)?;
        let m = k_inv * hmtx;

        let m_norm = m.norm();
        if !m_norm.is_finite() || m_norm <= Real::EPSILON {
            return Err(PoseError::InvalidPose("homography vanishes"));
        }

        let m1: Vec3 = m.column(0).into_owned();
        let m2: Vec3 = m.column(1).into_owned();
        let m3: Vec3 = m.column(2).into_owned();

        // Common scale: mean norm of the first two columns.
        let scale = 0.5 * (m1.norm() + m2.norm());
        if scale <= 1e-9 * m_norm {
            return Err(PoseError::InvalidPose("zero scale factor"));
        }

        let mut r1 = m1 / scale;
        let mut r2 = m2 / scale;
        let mut t_vec = m3 / scale;
        if t_vec.z < 0.0 {
            r1 = -r1;
            r2 = -r2;
            t_vec = -t_vec;
        }
        let r3 = r1.cross(&r2);
        if r3.norm() <= 1e-9 {
            return Err(PoseError::InvalidPose("rotation columns are parallel"));
        }

        let mut r_mat = Matrix3::<Real>::zeros();
        r_mat.set_column(0, &r1);
        r_mat.set_column(1, &r2);
        r_mat.set_column(2, &r3);

        let r_orth = project_to_so3(r_mat)?;
        Ok(Extrinsics::new(
            Rotation3::from_matrix_unchecked(r_orth),
            t_vec,
        ))
    }
}

/// Nearest proper rotation in the Frobenius sense (polar decomposition via SVD).
fn project_to_so3(r_mat: Mat3) -> Result<Mat3, PoseError> {
    let svd = r_mat.svd(true, true);
    let u = svd.u.ok_or(PoseError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PoseError::SvdFailed)?;

    let r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        Ok(u_flipped * v_t)
    } else {
        Ok(r_orth)
    }
}
