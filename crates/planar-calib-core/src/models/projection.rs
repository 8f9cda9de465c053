use crate::{CorrespondenceView, Extrinsics, FxFyCxCySkew, Pt2, Pt3, Real, Vec2};

/// Project a board point through a pose and pinhole intrinsics.
///
/// Returns `None` for points on or behind the camera plane.
pub fn project_point(
    intrinsics: &FxFyCxCySkew<Real>,
    pose: &Extrinsics,
    board_point: &Pt3,
) -> Option<Pt2> {
    let pc = pose.transform_point(board_point);
    if pc.z <= Real::EPSILON {
        return None;
    }
    let uv = intrinsics.normalized_to_pixel(&Vec2::new(pc.x / pc.z, pc.y / pc.z));
    Some(Pt2::new(uv.x, uv.y))
}

/// Per-point Euclidean reprojection errors (pixels) for one view.
///
/// Points that cannot be projected yield `Real::INFINITY`.
pub fn reprojection_errors(
    view: &CorrespondenceView,
    intrinsics: &FxFyCxCySkew<Real>,
    pose: &Extrinsics,
) -> Vec<Real> {
    view.points_3d
        .iter()
        .zip(&view.points_2d)
        .map(|(pw, obs)| match project_point(intrinsics, pose, pw) {
            Some(proj) => (proj - obs).norm(),
            None => Real::INFINITY,
        })
        .collect()
}

/// Mean Euclidean reprojection error (pixels) for one view.
///
/// An empty view has zero error.
pub fn mean_reprojection_error(
    view: &CorrespondenceView,
    intrinsics: &FxFyCxCySkew<Real>,
    pose: &Extrinsics,
) -> Real {
    let errs = reprojection_errors(view, intrinsics, pose);
    if errs.is_empty() {
        return 0.0;
    }
    errs.iter().sum::<Real>() / errs.len() as Real
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec3;
    use nalgebra::Rotation3;

    fn k() -> FxFyCxCySkew<Real> {
        FxFyCxCySkew {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        }
    }

    #[test]
    fn optical_axis_hits_principal_point() {
        let pose = Extrinsics::new(Rotation3::identity(), Vec3::new(0.0, 0.0, 5.0));
        let uv = project_point(&k(), &pose, &Pt3::origin()).unwrap();
        assert!((uv - Pt2::new(320.0, 240.0)).norm() < 1e-12);
    }

    #[test]
    fn points_behind_camera_are_rejected() {
        let pose = Extrinsics::new(Rotation3::identity(), Vec3::new(0.0, 0.0, -5.0));
        assert!(project_point(&k(), &pose, &Pt3::origin()).is_none());
    }

    #[test]
    fn reprojection_error_measures_pixel_offset() {
        let pose = Extrinsics::new(Rotation3::identity(), Vec3::new(0.0, 0.0, 4.0));
        let pts = vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 0.0, 0.0)];
        let obs = vec![Pt2::new(323.0, 244.0), Pt2::new(520.0, 240.0)];
        let view = CorrespondenceView::new(pts, obs).unwrap();

        let errs = reprojection_errors(&view, &k(), &pose);
        assert!((errs[0] - 5.0).abs() < 1e-12);
        assert!(errs[1].abs() < 1e-12);
        assert!((mean_reprojection_error(&view, &k(), &pose) - 2.5).abs() < 1e-12);
    }
}
