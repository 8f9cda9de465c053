//! Batch planar camera calibration.
//!
//! Runs the closed-form pipeline over a set of views of a planar target:
//! per-view homographies, shared pinhole intrinsics, then per-view poses.
//! Also provides the detection adapter, a comparator against externally
//! refined estimates, text reports and JSON helpers.
//!
//! ```no_run
//! use planar_calib_pipeline::{
//!     io::load_json, render_report, run_planar_calibration_from_detections,
//!     CalibrationConfig, DetectionSet,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let set: DetectionSet = load_json("detections.json")?;
//! let config = CalibrationConfig::default();
//! let result = run_planar_calibration_from_detections(&set, &config)?;
//! print!("{}", render_report(&result, &config.print));
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod config;
pub mod detection;
pub mod io;
pub mod planar_intrinsics;
pub mod report;

pub use compare::{
    compare_with_refined, ComparisonError, IntrinsicsDelta, PoseDelta, RefinedEstimate,
    RefinedView, RefinementComparison,
};
pub use config::{CalibrationConfig, PrintOptions, MIN_VIEWS};
pub use detection::{
    board_points, run_planar_calibration_from_detections, views_from_detections, Detection,
    DetectionCriteria, DetectionSet, PatternSize, PreparedViews,
};
pub use planar_intrinsics::{
    calibrate_views, run_planar_calibration, CalibrationError, CalibrationResult, DiscardStage,
    DiscardedView, IndexedView, ViewCalibration,
};
pub use report::{format_array, render_comparison, render_extrinsics, render_report};
