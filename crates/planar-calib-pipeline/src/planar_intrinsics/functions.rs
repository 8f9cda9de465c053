use log::{debug, info, warn};
use planar_calib_core::{mean_reprojection_error, CorrespondenceView, Mat3, Real};
use planar_calib_linear::{HomographySolver, PlanarPoseSolver, ZhangIntrinsicsSolver};
use rayon::prelude::*;

use super::types::{
    CalibrationError, CalibrationResult, DiscardStage, DiscardedView, ViewCalibration,
};
use crate::config::CalibrationConfig;

/// Board points further than this from `z = 0` make a view non-planar.
const PLANARITY_TOL: Real = 1e-9;

/// One view entering the pipeline, tagged with its input index.
#[derive(Debug, Clone, Copy)]
pub struct IndexedView<'a> {
    pub index: usize,
    pub name: Option<&'a str>,
    pub view: &'a CorrespondenceView,
}

/// Calibrate from a batch of correspondence sets, one per view.
///
/// Views whose homography or pose cannot be estimated are discarded and
/// recorded in the result. The run fails only if fewer than
/// [`CalibrationConfig::required_views`] views survive homography estimation,
/// if the intrinsic solve fails, or if no view yields a pose.
pub fn run_planar_calibration(
    views: &[CorrespondenceView],
    config: &CalibrationConfig,
) -> Result<CalibrationResult, CalibrationError> {
    let indexed: Vec<IndexedView<'_>> = views
        .iter()
        .enumerate()
        .map(|(index, view)| IndexedView {
            index,
            name: None,
            view,
        })
        .collect();
    calibrate_views(&indexed, Vec::new(), config)
}

/// Calibrate from pre-indexed views, carrying discards from earlier stages
/// (e.g. detection) into the result.
pub fn calibrate_views(
    views: &[IndexedView<'_>],
    mut discarded: Vec<DiscardedView>,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, CalibrationError> {
    let required = config.required_views();
    info!("calibrating from {} candidate views", views.len());

    // Stage 1: per-view homographies.
    let homographies = map_views(views, config.parallel, |iv| {
        if !iv.view.is_planar(PLANARITY_TOL) {
            return Err("target points are not planar (z != 0)".to_string());
        }
        HomographySolver::from_view(iv.view, &config.homography).map_err(|e| e.to_string())
    });

    let mut surviving: Vec<(IndexedView<'_>, Mat3)> = Vec::with_capacity(views.len());
    for (iv, res) in views.iter().zip(homographies) {
        match res {
            Ok(h) => surviving.push((*iv, h)),
            Err(reason) => discarded.push(discard(iv, DiscardStage::Homography, reason)),
        }
    }

    if surviving.len() < required {
        sort_discarded(&mut discarded);
        return Err(CalibrationError::InsufficientViews {
            required,
            usable: surviving.len(),
            discarded,
        });
    }

    // Stage 2: shared intrinsics; every pose below depends on it.
    let hmtxs: Vec<Mat3> = surviving.iter().map(|(_, h)| *h).collect();
    let intrinsics = match ZhangIntrinsicsSolver::solve(&hmtxs, &config.intrinsics) {
        Ok(k) => k,
        Err(source) => {
            sort_discarded(&mut discarded);
            return Err(CalibrationError::Intrinsics { source, discarded });
        }
    };
    info!(
        "intrinsics from {} views: fx={:.3} fy={:.3} cx={:.3} cy={:.3} skew={:.3}",
        hmtxs.len(),
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy,
        intrinsics.skew
    );
    let kmtx = intrinsics.k_matrix();

    // Stage 3: per-view poses against the shared, read-only K.
    let poses = map_views(&surviving, config.parallel, |(iv, h)| {
        PlanarPoseSolver::from_homography(&kmtx, h).map(|pose| ViewCalibration {
            index: iv.index,
            name: iv.name.map(str::to_owned),
            pose,
            reproj_error: mean_reprojection_error(iv.view, &intrinsics, &pose),
        })
    });

    let mut calibrated = Vec::with_capacity(surviving.len());
    for ((iv, _), res) in surviving.iter().zip(poses) {
        match res {
            Ok(vc) => {
                debug!("view {}: reprojection error {:.6} px", vc.index, vc.reproj_error);
                calibrated.push(vc);
            }
            Err(err) => discarded.push(discard(iv, DiscardStage::Pose, err.to_string())),
        }
    }

    sort_discarded(&mut discarded);
    if calibrated.is_empty() {
        return Err(CalibrationError::InsufficientViews {
            required: 1,
            usable: 0,
            discarded,
        });
    }

    let result = CalibrationResult::new(intrinsics, calibrated, discarded);
    info!(
        "calibrated {} views ({} discarded), mean reprojection error {:.6} px",
        result.views().len(),
        result.discarded().len(),
        result.mean_reproj_error()
    );
    Ok(result)
}

fn discard(iv: &IndexedView<'_>, stage: DiscardStage, reason: String) -> DiscardedView {
    warn!("discarding view {} at {} stage: {}", iv.index, stage, reason);
    DiscardedView {
        index: iv.index,
        name: iv.name.map(str::to_owned),
        stage,
        reason,
    }
}

fn sort_discarded(discarded: &mut [DiscardedView]) {
    discarded.sort_by_key(|d| d.index);
}

/// Apply `f` to every item, in parallel when requested; output order matches input.
fn map_views<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;
    use planar_calib_core::{synthetic::planar, Extrinsics, FxFyCxCySkew, Pt2, Pt3, Vec3};
    use planar_calib_linear::IntrinsicsError;

    fn k_gt() -> FxFyCxCySkew<Real> {
        FxFyCxCySkew {
            fx: 1250.0,
            fy: 1220.0,
            cx: 640.0,
            cy: 400.0,
            skew: 0.0,
        }
    }

    fn synthetic_views(n: usize) -> Vec<CorrespondenceView> {
        let board = planar::grid_points(8, 6, 0.05);
        let poses = planar::board_orbit_poses(n, Pt3::new(0.175, 0.125, 0.0), 0.8, 0.35);
        planar::project_views(&k_gt(), &board, &poses).unwrap()
    }

    #[test]
    fn zhang_pipeline_recovers_intrinsics() {
        let views = synthetic_views(4);
        let result = run_planar_calibration(&views, &CalibrationConfig::default()).unwrap();
        let k = result.intrinsics();
        assert!((k.fx - 1250.0).abs() < 1e-4, "fx {}", k.fx);
        assert!((k.fy - 1220.0).abs() < 1e-4, "fy {}", k.fy);
        assert!((k.cx - 640.0).abs() < 1e-4, "cx {}", k.cx);
        assert!((k.cy - 400.0).abs() < 1e-4, "cy {}", k.cy);
        assert_eq!(result.views().len(), 4);
        assert!(result.discarded().is_empty());
        assert!(result.mean_reproj_error() < 1e-6);
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        let views = synthetic_views(5);
        let par = run_planar_calibration(&views, &CalibrationConfig::default()).unwrap();
        let seq_cfg = CalibrationConfig {
            parallel: false,
            ..CalibrationConfig::default()
        };
        let seq = run_planar_calibration(&views, &seq_cfg).unwrap();
        assert_eq!(par.intrinsics(), seq.intrinsics());
        let par_idx: Vec<usize> = par.views().iter().map(|v| v.index).collect();
        let seq_idx: Vec<usize> = seq.views().iter().map(|v| v.index).collect();
        assert_eq!(par_idx, seq_idx);
    }

    #[test]
    fn bad_views_are_discarded_not_fatal() {
        let mut views = synthetic_views(4);
        // Too few points.
        views.insert(
            1,
            CorrespondenceView::new(vec![Pt3::origin(); 3], vec![Pt2::origin(); 3]).unwrap(),
        );
        // Non-planar board.
        let mut bent = views[0].clone();
        bent.points_3d[0].z = 0.01;
        views.push(bent);

        let result = run_planar_calibration(&views, &CalibrationConfig::default()).unwrap();
        assert_eq!(result.views().len(), 4);
        let dropped: Vec<usize> = result.discarded().iter().map(|d| d.index).collect();
        assert_eq!(dropped, vec![1, 5]);
        assert!(result
            .discarded()
            .iter()
            .all(|d| d.stage == DiscardStage::Homography));
        assert!(result.view(1).is_none());
        assert!(result.view(2).is_some());
    }

    #[test]
    fn too_few_survivors_fail_with_reasons() {
        let mut views = synthetic_views(2);
        views.push(CorrespondenceView::new(vec![], vec![]).unwrap());
        let err = run_planar_calibration(&views, &CalibrationConfig::default()).unwrap_err();
        match &err {
            CalibrationError::InsufficientViews {
                required, usable, ..
            } => {
                assert_eq!(*required, 3);
                assert_eq!(*usable, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.discarded().len(), 1);
        assert_eq!(err.discarded()[0].index, 2);
    }

    #[test]
    fn shared_orientation_is_fatal_and_keeps_discards() {
        let board = planar::grid_points(8, 6, 0.05);
        let rot = Rotation3::from_euler_angles(0.25, -0.15, 0.1);
        let poses: Vec<Extrinsics> = (0..3)
            .map(|i| {
                let t = Vec3::new(-0.15 + 0.05 * i as Real, -0.1, 0.8 + 0.2 * i as Real);
                Extrinsics::new(rot, t)
            })
            .collect();
        let mut views = planar::project_views(&k_gt(), &board, &poses).unwrap();
        views.insert(0, CorrespondenceView::new(vec![], vec![]).unwrap());

        let err = run_planar_calibration(&views, &CalibrationConfig::default()).unwrap_err();
        match &err {
            CalibrationError::Intrinsics { source, discarded } => {
                assert!(
                    matches!(source, IntrinsicsError::Underconstrained { views: 3, .. }),
                    "{source}"
                );
                assert_eq!(discarded.len(), 1);
                assert_eq!(discarded[0].index, 0);
                assert_eq!(discarded[0].stage, DiscardStage::Homography);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.discarded().len(), 1);
    }
}
