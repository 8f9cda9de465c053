//! Board geometry and detected-corner inputs.
//!
//! Corner detection itself happens outside this crate; a [`DetectionSet`] is
//! the serialized output of a detector run over an image folder.

use anyhow::{bail, Context, Result};
use log::debug;
use planar_calib_core::{CorrespondenceView, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::CalibrationConfig;
use crate::planar_intrinsics::{
    calibrate_views, CalibrationError, CalibrationResult, DiscardStage, DiscardedView,
    IndexedView,
};

/// Inner-corner count of a chessboard pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSize {
    pub cols: usize,
    pub rows: usize,
}

impl PatternSize {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    pub fn corner_count(&self) -> usize {
        self.cols * self.rows
    }
}

impl Default for PatternSize {
    fn default() -> Self {
        Self::new(10, 7)
    }
}

impl fmt::Display for PatternSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

impl FromStr for PatternSize {
    type Err = anyhow::Error;

    /// Parse `"COLSxROWS"`, e.g. `"10x7"`.
    fn from_str(s: &str) -> Result<Self> {
        let Some((c, r)) = s.trim().split_once(['x', 'X']) else {
            bail!("pattern size must look like COLSxROWS, got {s:?}");
        };
        let cols: usize = c.trim().parse().with_context(|| format!("bad column count {c:?}"))?;
        let rows: usize = r.trim().parse().with_context(|| format!("bad row count {r:?}"))?;
        if cols < 2 || rows < 2 {
            bail!("pattern needs at least 2x2 inner corners, got {cols}x{rows}");
        }
        Ok(Self { cols, rows })
    }
}

/// Board-frame coordinates of every inner corner on `z = 0`.
///
/// Row-major: the column index varies fastest, matching the corner order
/// reported by chessboard detectors.
pub fn board_points(pattern: PatternSize, square_size: Real) -> Vec<Pt3> {
    let mut pts = Vec::with_capacity(pattern.corner_count());
    for r in 0..pattern.rows {
        for c in 0..pattern.cols {
            pts.push(Pt3::new(c as Real * square_size, r as Real * square_size, 0.0));
        }
    }
    pts
}

/// Sub-pixel corner refinement settings used by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionCriteria {
    pub max_iters: u32,
    pub epsilon: Real,
    /// Search window (width, height) in pixels.
    pub subpix_window: (u32, u32),
}

impl Default for DetectionCriteria {
    fn default() -> Self {
        Self {
            max_iters: 30,
            epsilon: 1e-3,
            subpix_window: (11, 11),
        }
    }
}

/// Corner detection outcome for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    pub found: bool,
    #[serde(default)]
    pub image_points: Vec<Pt2>,
}

/// Detector output for a batch of images of the same board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    #[serde(default)]
    pub pattern: PatternSize,
    #[serde(default = "default_square_size")]
    pub square_size: Real,
    #[serde(default)]
    pub criteria: DetectionCriteria,
    /// Image (width, height) in pixels, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<(u32, u32)>,
    pub detections: Vec<Detection>,
}

fn default_square_size() -> Real {
    1.0
}

/// Correspondence views built from a [`DetectionSet`], plus the images that
/// could not be used.
#[derive(Debug, Clone)]
pub struct PreparedViews {
    /// `(input index, image name, view)` for every usable detection.
    pub views: Vec<(usize, String, CorrespondenceView)>,
    pub discarded: Vec<DiscardedView>,
}

/// Pair every successful detection with the board points.
///
/// Images where the pattern was not found, or where the corner count does
/// not match the pattern, are discarded at the detection stage.
pub fn views_from_detections(set: &DetectionSet) -> PreparedViews {
    let board = board_points(set.pattern, set.square_size);
    let mut views = Vec::new();
    let mut discarded = Vec::new();

    for (index, det) in set.detections.iter().enumerate() {
        let reason = if !det.found {
            Some("pattern not found".to_string())
        } else if det.image_points.len() != board.len() {
            Some(format!(
                "expected {} corners for a {} pattern, got {}",
                board.len(),
                set.pattern,
                det.image_points.len()
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => {
                debug!("image {} ({}): {}", index, det.name, reason);
                discarded.push(DiscardedView {
                    index,
                    name: Some(det.name.clone()),
                    stage: DiscardStage::Detection,
                    reason,
                });
            }
            None => views.push((
                index,
                det.name.clone(),
                CorrespondenceView {
                    points_3d: board.clone(),
                    points_2d: det.image_points.clone(),
                },
            )),
        }
    }

    PreparedViews { views, discarded }
}

/// Calibrate from detector output; detection failures are reported alongside
/// later discards.
pub fn run_planar_calibration_from_detections(
    set: &DetectionSet,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, CalibrationError> {
    let prepared = views_from_detections(set);
    let indexed: Vec<IndexedView<'_>> = prepared
        .views
        .iter()
        .map(|(index, name, view)| IndexedView {
            index: *index,
            name: Some(name.as_str()),
            view,
        })
        .collect();
    calibrate_views(&indexed, prepared.discarded, config)
}
