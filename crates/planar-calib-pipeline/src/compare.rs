//! Cross-check of the closed-form estimate against an external refinement.
//!
//! A refined estimate comes from any nonlinear calibrator (e.g. a bundle
//! adjustment over the same views). Both sides are read-only here; the
//! comparison only reports how far apart they are.

use nalgebra::{Rotation3, Vector3};
use planar_calib_core::{BrownConrady5, Extrinsics, FxFyCxCySkew, Mat3, Real, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::planar_intrinsics::CalibrationResult;

/// Pose of one view in a refined estimate, in OpenCV `rvec`/`tvec` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinedView {
    /// Index of the view in the input sequence.
    pub index: usize,
    /// Axis-angle rotation (radians).
    pub rvec: [Real; 3],
    pub tvec: [Real; 3],
}

impl RefinedView {
    pub fn pose(&self) -> Extrinsics {
        let rot = Rotation3::new(Vector3::from(self.rvec));
        Extrinsics::new(rot, Vec3::from(self.tvec))
    }
}

/// Camera model and poses produced by an external nonlinear calibrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedEstimate {
    /// Row-major 3x3 camera matrix.
    pub camera_matrix: [[Real; 3]; 3],
    /// OpenCV order `(k1, k2, p1, p2, k3)`.
    #[serde(default)]
    pub dist_coeffs: [Real; 5],
    #[serde(default)]
    pub views: Vec<RefinedView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_reproj_error: Option<Real>,
}

impl RefinedEstimate {
    pub fn from_parts(
        intrinsics: &FxFyCxCySkew<Real>,
        distortion: &BrownConrady5<Real>,
        poses: &[(usize, Extrinsics)],
        mean_reproj_error: Option<Real>,
    ) -> Self {
        let k = intrinsics.k_matrix();
        let mut camera_matrix = [[0.0; 3]; 3];
        for (r, row) in camera_matrix.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = k[(r, c)];
            }
        }
        let views = poses
            .iter()
            .map(|(index, pose)| {
                let rv = pose.rotation().scaled_axis();
                let t = pose.translation();
                RefinedView {
                    index: *index,
                    rvec: [rv.x, rv.y, rv.z],
                    tvec: [t.x, t.y, t.z],
                }
            })
            .collect();
        Self {
            camera_matrix,
            dist_coeffs: distortion.to_opencv(),
            views,
            mean_reproj_error,
        }
    }

    pub fn k_matrix(&self) -> Mat3 {
        let m = &self.camera_matrix;
        Mat3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ComparisonError {
    #[error("refined camera matrix is not a valid pinhole intrinsic matrix")]
    InvalidCameraMatrix,
    #[error("refined estimate lists view {0} more than once")]
    DuplicateView(usize),
    #[error("refined estimate contains a non-finite value in {0}")]
    NonFinite(&'static str),
}

/// `refined - closed_form` for each pinhole parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicsDelta {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
    pub skew: Real,
}

impl IntrinsicsDelta {
    pub fn max_abs(&self) -> Real {
        [self.fx, self.fy, self.cx, self.cy, self.skew]
            .iter()
            .fold(0.0, |m: Real, v| m.max(v.abs()))
    }
}

/// Pose divergence for a view present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseDelta {
    pub index: usize,
    /// Angle of the relative rotation (radians).
    pub rotation_angle: Real,
    /// Euclidean distance between translations (board units).
    pub translation_distance: Real,
}

/// Per-parameter divergence between a closed-form and a refined estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementComparison {
    pub intrinsics: IntrinsicsDelta,
    /// `refined - closed_form`, OpenCV order.
    pub distortion: [Real; 5],
    /// Ordered by view index.
    pub poses: Vec<PoseDelta>,
    /// Views calibrated in closed form but absent from the refined estimate.
    pub missing_in_refined: Vec<usize>,
    /// Views in the refined estimate with no closed-form pose.
    pub missing_in_result: Vec<usize>,
    /// `refined - closed_form` mean reprojection error, when the refined
    /// side reports one.
    pub reproj_error_delta: Option<Real>,
}

impl RefinementComparison {
    /// Largest per-view rotation angle; `NaN` if any view's angle is `NaN`.
    pub fn max_rotation_angle(&self) -> Real {
        nan_max(self.poses.iter().map(|p| p.rotation_angle))
    }

    /// Largest per-view translation distance; `NaN` if any is `NaN`.
    pub fn max_translation_distance(&self) -> Real {
        nan_max(self.poses.iter().map(|p| p.translation_distance))
    }
}

/// Maximum that propagates `NaN` instead of skipping it like `f64::max`.
fn nan_max(values: impl Iterator<Item = Real>) -> Real {
    values.fold(0.0, |m: Real, v| {
        if m.is_nan() || v.is_nan() {
            Real::NAN
        } else {
            m.max(v)
        }
    })
}

/// `true` if the entries below the diagonal vanish relative to the largest entry.
fn is_upper_triangular(m: &[[Real; 3]; 3]) -> bool {
    let scale = m.iter().flatten().fold(0.0, |a: Real, v| a.max(v.abs()));
    let tol = 1e-12 * scale;
    m[1][0].abs() <= tol && m[2][0].abs() <= tol && m[2][1].abs() <= tol
}

/// Compare a closed-form calibration with an externally refined estimate.
pub fn compare_with_refined(
    result: &CalibrationResult,
    refined: &RefinedEstimate,
) -> Result<RefinementComparison, ComparisonError> {
    if refined.camera_matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ComparisonError::NonFinite("camera_matrix"));
    }
    if refined.dist_coeffs.iter().any(|v| !v.is_finite()) {
        return Err(ComparisonError::NonFinite("dist_coeffs"));
    }
    if !is_upper_triangular(&refined.camera_matrix) {
        return Err(ComparisonError::InvalidCameraMatrix);
    }
    let refined_k = FxFyCxCySkew::from_k_matrix(&refined.k_matrix())
        .filter(|k| k.is_valid())
        .ok_or(ComparisonError::InvalidCameraMatrix)?;

    let k = result.intrinsics();
    let intrinsics = IntrinsicsDelta {
        fx: refined_k.fx - k.fx,
        fy: refined_k.fy - k.fy,
        cx: refined_k.cx - k.cx,
        cy: refined_k.cy - k.cy,
        skew: refined_k.skew - k.skew,
    };

    let closed_dist = result.distortion().to_opencv();
    let mut distortion = [0.0; 5];
    for (d, (r, c)) in distortion
        .iter_mut()
        .zip(refined.dist_coeffs.iter().zip(closed_dist.iter()))
    {
        *d = r - c;
    }

    let mut seen = BTreeSet::new();
    let mut poses = Vec::new();
    let mut missing_in_result = Vec::new();
    for rv in &refined.views {
        if !seen.insert(rv.index) {
            return Err(ComparisonError::DuplicateView(rv.index));
        }
        if rv.rvec.iter().chain(&rv.tvec).any(|v| !v.is_finite()) {
            return Err(ComparisonError::NonFinite("views"));
        }
        match result.view(rv.index) {
            Some(vc) => {
                let other = rv.pose();
                poses.push(PoseDelta {
                    index: rv.index,
                    rotation_angle: vc.pose.rotation_angle_to(&other),
                    translation_distance: (vc.pose.translation() - other.translation()).norm(),
                });
            }
            None => missing_in_result.push(rv.index),
        }
    }
    poses.sort_by_key(|p| p.index);
    missing_in_result.sort_unstable();

    let missing_in_refined = result
        .views()
        .iter()
        .map(|v| v.index)
        .filter(|i| !seen.contains(i))
        .collect();

    Ok(RefinementComparison {
        intrinsics,
        distortion,
        poses,
        missing_in_refined,
        missing_in_result,
        reproj_error_delta: refined
            .mean_reproj_error
            .map(|e| e - result.mean_reproj_error()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use crate::planar_intrinsics::run_planar_calibration;
    use planar_calib_core::synthetic::planar;
    use planar_calib_core::Pt3;

    fn calibrated() -> CalibrationResult {
        let k = FxFyCxCySkew {
            fx: 900.0,
            fy: 880.0,
            cx: 330.0,
            cy: 250.0,
            skew: 0.0,
        };
        let board = planar::grid_points(9, 6, 1.0);
        let poses = planar::board_orbit_poses(4, Pt3::new(4.0, 2.5, 0.0), 18.0, 0.4);
        let views = planar::project_views(&k, &board, &poses).unwrap();
        run_planar_calibration(&views, &CalibrationConfig::default()).unwrap()
    }

    fn as_refined(result: &CalibrationResult) -> RefinedEstimate {
        let poses: Vec<(usize, Extrinsics)> =
            result.views().iter().map(|v| (v.index, v.pose)).collect();
        RefinedEstimate::from_parts(
            result.intrinsics(),
            result.distortion(),
            &poses,
            Some(result.mean_reproj_error()),
        )
    }

    #[test]
    fn identical_estimates_have_zero_deltas() {
        let result = calibrated();
        let cmp = compare_with_refined(&result, &as_refined(&result)).unwrap();
        assert!(cmp.intrinsics.max_abs() < 1e-9, "{:?}", cmp.intrinsics);
        assert!(cmp.distortion.iter().all(|d| *d == 0.0));
        assert_eq!(cmp.poses.len(), 4);
        for p in &cmp.poses {
            assert!(
                p.rotation_angle.is_finite() && p.rotation_angle < 1e-6,
                "view {}: rotation angle {}",
                p.index,
                p.rotation_angle
            );
        }
        assert!(cmp.max_rotation_angle() < 1e-6);
        assert!(cmp.max_translation_distance() < 1e-9);
        assert!(cmp.missing_in_refined.is_empty());
        assert!(cmp.missing_in_result.is_empty());
        assert!(cmp.reproj_error_delta.unwrap().abs() < 1e-12);
    }

    #[test]
    fn deltas_and_missing_views_are_reported() {
        let result = calibrated();
        let mut refined = as_refined(&result);
        refined.camera_matrix[0][0] += 2.5;
        refined.camera_matrix[1][2] -= 1.0;
        refined.dist_coeffs = [0.1, -0.05, 0.0, 0.0, 0.01];
        refined.views.retain(|v| v.index != 2);
        refined.views[0].tvec[2] += 0.5;
        refined.views.push(RefinedView {
            index: 9,
            rvec: [0.0; 3],
            tvec: [0.0, 0.0, 10.0],
        });
        refined.mean_reproj_error = Some(result.mean_reproj_error() + 0.25);

        let cmp = compare_with_refined(&result, &refined).unwrap();
        assert!((cmp.intrinsics.fx - 2.5).abs() < 1e-9);
        assert!((cmp.intrinsics.cy + 1.0).abs() < 1e-9);
        assert!((cmp.distortion[0] - 0.1).abs() < 1e-15);
        assert!((cmp.distortion[4] - 0.01).abs() < 1e-15);
        assert_eq!(cmp.missing_in_refined, vec![2]);
        assert_eq!(cmp.missing_in_result, vec![9]);
        let idx: Vec<usize> = cmp.poses.iter().map(|p| p.index).collect();
        assert_eq!(idx, vec![0, 1, 3]);
        assert!((cmp.poses[0].translation_distance - 0.5).abs() < 1e-9);
        assert!((cmp.reproj_error_delta.unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_refined_estimates() {
        let result = calibrated();

        let mut bad_k = as_refined(&result);
        bad_k.camera_matrix[0][0] = -1.0;
        assert_eq!(
            compare_with_refined(&result, &bad_k).unwrap_err(),
            ComparisonError::InvalidCameraMatrix
        );

        let mut skewed = as_refined(&result);
        skewed.camera_matrix[1][0] = 5.0;
        assert_eq!(
            compare_with_refined(&result, &skewed).unwrap_err(),
            ComparisonError::InvalidCameraMatrix
        );

        let mut bottom = as_refined(&result);
        bottom.camera_matrix[2][1] = 1e-3;
        assert_eq!(
            compare_with_refined(&result, &bottom).unwrap_err(),
            ComparisonError::InvalidCameraMatrix
        );

        let mut dup = as_refined(&result);
        let first = dup.views[0];
        dup.views.push(first);
        assert_eq!(
            compare_with_refined(&result, &dup).unwrap_err(),
            ComparisonError::DuplicateView(first.index)
        );

        let mut nan = as_refined(&result);
        nan.dist_coeffs[1] = Real::NAN;
        assert_eq!(
            compare_with_refined(&result, &nan).unwrap_err(),
            ComparisonError::NonFinite("dist_coeffs")
        );
    }

    #[test]
    fn max_helpers_propagate_nan() {
        let delta = |index, rotation_angle, translation_distance| PoseDelta {
            index,
            rotation_angle,
            translation_distance,
        };
        let mut cmp = compare_with_refined(&calibrated(), &as_refined(&calibrated())).unwrap();
        cmp.poses = vec![delta(0, 0.2, 1.0), delta(1, 0.5, 0.1)];
        assert_eq!(cmp.max_rotation_angle(), 0.5);
        assert_eq!(cmp.max_translation_distance(), 1.0);

        cmp.poses.push(delta(2, Real::NAN, Real::NAN));
        cmp.poses.push(delta(3, 0.1, 0.1));
        assert!(cmp.max_rotation_angle().is_nan());
        assert!(cmp.max_translation_distance().is_nan());

        cmp.poses.clear();
        assert_eq!(cmp.max_rotation_angle(), 0.0);
    }

    #[test]
    fn refined_estimate_reads_from_json() {
        let json = r#"{
            "camera_matrix": [[800, 0, 320], [0, 800, 240], [0, 0, 1]],
            "views": [ { "index": 0, "rvec": [0, 0, 0], "tvec": [0, 0, 5] } ]
        }"#;
        let refined: RefinedEstimate = serde_json::from_str(json).unwrap();
        assert_eq!(refined.dist_coeffs, [0.0; 5]);
        assert!(refined.mean_reproj_error.is_none());
        assert_eq!(refined.views[0].pose().translation().z, 5.0);
    }
}
