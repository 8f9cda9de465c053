//! Result and error types for planar calibration runs.

use planar_calib_core::{BrownConrady5, Extrinsics, FxFyCxCySkew, Mat3, Real};
use planar_calib_linear::IntrinsicsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage at which a view was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardStage {
    /// The corner detector did not find the pattern, or found the wrong
    /// number of corners.
    Detection,
    /// The view produced no usable homography.
    Homography,
    /// The view's pose could not be recovered from its homography.
    Pose,
}

impl fmt::Display for DiscardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscardStage::Detection => "detection",
            DiscardStage::Homography => "homography",
            DiscardStage::Pose => "pose",
        };
        f.write_str(s)
    }
}

/// A view excluded from the calibration, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardedView {
    /// Index of the view in the input sequence.
    pub index: usize,
    /// Source name (e.g. image file), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub stage: DiscardStage,
    pub reason: String,
}

/// Calibration output for one surviving view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewCalibration {
    /// Index of the view in the input sequence.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Board → camera pose.
    pub pose: Extrinsics,
    /// Mean reprojection error over the view's points (pixels).
    pub reproj_error: Real,
}

/// Result of a closed-form planar calibration run.
///
/// Built once by the orchestrator and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    intrinsics: FxFyCxCySkew<Real>,
    distortion: BrownConrady5<Real>,
    views: Vec<ViewCalibration>,
    mean_reproj_error: Real,
    discarded: Vec<DiscardedView>,
}

impl CalibrationResult {
    pub(crate) fn new(
        intrinsics: FxFyCxCySkew<Real>,
        views: Vec<ViewCalibration>,
        discarded: Vec<DiscardedView>,
    ) -> Self {
        let mean_reproj_error = if views.is_empty() {
            0.0
        } else {
            views.iter().map(|v| v.reproj_error).sum::<Real>() / views.len() as Real
        };
        Self {
            intrinsics,
            distortion: BrownConrady5::zero(),
            views,
            mean_reproj_error,
            discarded,
        }
    }

    pub fn intrinsics(&self) -> &FxFyCxCySkew<Real> {
        &self.intrinsics
    }

    pub fn k_matrix(&self) -> Mat3 {
        self.intrinsics.k_matrix()
    }

    /// Distortion coefficients; always zero for the pinhole closed-form model.
    pub fn distortion(&self) -> &BrownConrady5<Real> {
        &self.distortion
    }

    /// Per-view poses and errors, ordered by input index.
    pub fn views(&self) -> &[ViewCalibration] {
        &self.views
    }

    pub fn view(&self, index: usize) -> Option<&ViewCalibration> {
        self.views.iter().find(|v| v.index == index)
    }

    /// Mean over views of the per-view mean reprojection error (pixels).
    pub fn mean_reproj_error(&self) -> Real {
        self.mean_reproj_error
    }

    pub fn per_view_errors(&self) -> Vec<(usize, Real)> {
        self.views.iter().map(|v| (v.index, v.reproj_error)).collect()
    }

    /// Views dropped at any stage, ordered by input index.
    pub fn discarded(&self) -> &[DiscardedView] {
        &self.discarded
    }
}

/// Failures that abort a whole calibration run.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error(
        "need at least {required} usable views, {usable} survived ({} discarded)",
        .discarded.len()
    )]
    InsufficientViews {
        required: usize,
        usable: usize,
        discarded: Vec<DiscardedView>,
    },
    #[error("intrinsics estimation failed: {source}")]
    Intrinsics {
        #[source]
        source: IntrinsicsError,
        discarded: Vec<DiscardedView>,
    },
}

impl CalibrationError {
    /// Views discarded before the run failed.
    pub fn discarded(&self) -> &[DiscardedView] {
        match self {
            CalibrationError::InsufficientViews { discarded, .. } => discarded,
            CalibrationError::Intrinsics { discarded, .. } => discarded,
        }
    }
}
