//! Run configuration for planar calibration.

use planar_calib_linear::{HomographyOptions, ZhangOptions};
use serde::{Deserialize, Serialize};

/// The closed-form solve needs two constraints per view on five unknowns.
pub const MIN_VIEWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Minimum number of views that must survive homography estimation.
    /// Values below [`MIN_VIEWS`] are raised to it.
    pub min_views: usize,
    pub homography: HomographyOptions,
    pub intrinsics: ZhangOptions,
    /// Run per-view stages on the rayon thread pool.
    pub parallel: bool,
    pub print: PrintOptions,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_views: MIN_VIEWS,
            homography: HomographyOptions::default(),
            intrinsics: ZhangOptions::default(),
            parallel: true,
            print: PrintOptions::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn required_views(&self) -> usize {
        self.min_views.max(MIN_VIEWS)
    }
}

/// Fixed-precision numeric formatting for text reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Decimals for matrices with more than one row and column.
    pub matrix_precision: usize,
    /// Decimals for row or column vectors.
    pub vector_precision: usize,
    /// Minimum field width; values are right-aligned.
    pub width: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            matrix_precision: 3,
            vector_precision: 6,
            width: 10,
        }
    }
}
