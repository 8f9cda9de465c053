//! Closed-form solvers for planar camera calibration.
//!
//! The stages mirror Zhang's method:
//!
//! 1. [`HomographySolver`]: board plane → image homography per view
//!    (normalized DLT),
//! 2. [`estimate_intrinsics_from_homographies`]: shared intrinsics `K` from
//!    three or more homographies,
//! 3. [`PlanarPoseSolver`]: per-view rotation and translation from `H` and `K`.
//!
//! All solvers are pure functions of their inputs; each stage reports failures
//! through its own error type so callers can decide which failures are fatal.

pub mod math;

mod homography;
mod planar_pose;
mod zhang_intrinsics;

pub use homography::*;
pub use planar_pose::*;
pub use zhang_intrinsics::*;

pub mod prelude {
    pub use crate::homography::{dlt_homography, HomographyError, HomographyOptions};
    pub use crate::planar_pose::{estimate_planar_pose_from_h, PoseError};
    pub use crate::zhang_intrinsics::{
        estimate_intrinsics_from_homographies, IntrinsicsError, ZhangOptions,
    };
}
