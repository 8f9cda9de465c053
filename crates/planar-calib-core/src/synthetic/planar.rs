//! Synthetic planar target helpers.
//!
//! The functions here build planar point grids (Z=0), generate camera poses
//! looking at the target, and project the target through a pinhole camera.

use crate::{project_point, CorrespondenceView, Extrinsics, FxFyCxCySkew, Pt3, Real, Vec3};
use anyhow::Result;
use nalgebra::Rotation3;
use std::f64::consts::TAU;

/// Generate a planar grid of 3D points (Z=0) with `nx * ny` points.
///
/// Points are ordered deterministically in row-major order (Y major):
/// point `j * nx + i` is `(i * spacing, j * spacing, 0)`.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(nx.saturating_mul(ny));
    for j in 0..ny {
        for i in 0..nx {
            points.push(Pt3::new(i as Real * spacing, j as Real * spacing, 0.0));
        }
    }
    points
}

/// Generate `n_views` board poses distributed on a cone around the optical axis.
///
/// View `i` tilts the board by `tilt_rad` around an in-plane axis whose
/// direction advances by `2π / n_views` per view, adds a small roll about the
/// optical axis, and places `board_center` roughly `distance` in front of the
/// camera. Tilting around varying axes keeps the views independent for
/// intrinsics estimation.
pub fn board_orbit_poses(
    n_views: usize,
    board_center: Pt3,
    distance: Real,
    tilt_rad: Real,
) -> Vec<Extrinsics> {
    (0..n_views)
        .map(|view_idx| {
            let phi = TAU * view_idx as Real / n_views.max(1) as Real;
            let roll = -0.2 + 0.1 * view_idx as Real;
            let rot = Rotation3::from_euler_angles(tilt_rad * phi.cos(), tilt_rad * phi.sin(), roll);

            let lateral = 0.05 * distance;
            let target = Vec3::new(
                lateral * (phi + 1.0).cos(),
                lateral * (phi + 1.0).sin(),
                distance * (1.0 + 0.1 * view_idx as Real / n_views.max(1) as Real),
            );
            let translation = target - rot * board_center.coords;
            Extrinsics::new(rot, translation)
        })
        .collect()
}

/// Project a planar target into the camera, requiring every point to be projectable.
pub fn project_view(
    intrinsics: &FxFyCxCySkew<Real>,
    pose: &Extrinsics,
    target_points: &[Pt3],
) -> Result<CorrespondenceView> {
    let mut pixels = Vec::with_capacity(target_points.len());
    for (idx, pw) in target_points.iter().enumerate() {
        let Some(uv) = project_point(intrinsics, pose, pw) else {
            let pc = pose.transform_point(pw);
            anyhow::bail!("point {idx} not projectable (z={:.6})", pc.z);
        };
        pixels.push(uv);
    }

    CorrespondenceView::new(target_points.to_vec(), pixels)
}

/// Project multiple views, requiring every point to be projectable in every view.
pub fn project_views(
    intrinsics: &FxFyCxCySkew<Real>,
    target_points: &[Pt3],
    poses: &[Extrinsics],
) -> Result<Vec<CorrespondenceView>> {
    poses
        .iter()
        .map(|pose| project_view(intrinsics, pose, target_points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_points_order_is_stable() {
        let pts = grid_points(2, 3, 0.5);
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Pt3::new(0.5, 0.0, 0.0));
        assert_eq!(pts[2], Pt3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn orbit_poses_keep_board_in_front() {
        let center = Pt3::new(4.5, 3.0, 0.0);
        let board = grid_points(10, 7, 1.0);
        for pose in board_orbit_poses(6, center, 20.0, 0.4) {
            assert!((pose.rotation_matrix().determinant() - 1.0).abs() < 1e-12);
            let c = pose.transform_point(&center);
            assert!((c.z - 20.0).abs() < 2.5, "center depth {}", c.z);
            assert!(board.iter().all(|p| pose.transform_point(p).z > 0.0));
        }
    }

    #[test]
    fn project_view_produces_matching_correspondences() {
        let k = FxFyCxCySkew {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let board = grid_points(3, 2, 0.05);
        let pose = Extrinsics::new(Rotation3::identity(), Vec3::new(0.0, 0.0, 1.0));

        let view = project_view(&k, &pose, &board).unwrap();
        assert_eq!(view.points_3d.len(), board.len());
        assert_eq!(view.points_2d.len(), board.len());
    }

    #[test]
    fn project_view_rejects_points_behind_camera() {
        let k = FxFyCxCySkew {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let pose = Extrinsics::new(Rotation3::identity(), Vec3::new(0.0, 0.0, -1.0));
        assert!(project_view(&k, &pose, &grid_points(2, 2, 1.0)).is_err());
    }
}
