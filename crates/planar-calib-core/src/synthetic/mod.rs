//! Deterministic synthetic data generation helpers.
//!
//! This module provides small building blocks for constructing synthetic
//! planar calibration problems used in tests and demos:
//! - planar target point grids,
//! - tilted board poses that keep the target in front of the camera,
//! - projection helpers producing [`crate::CorrespondenceView`],
//! - deterministic pseudo-random pixel noise.
//!
//! Everything is deterministic (explicit seeds, stable point ordering).
//!
//! # Example
//!
//! ```
//! use planar_calib_core::{synthetic::planar, FxFyCxCySkew, Pt3};
//!
//! let k = FxFyCxCySkew { fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0, skew: 0.0 };
//! let board = planar::grid_points(10, 7, 1.0);
//! let poses = planar::board_orbit_poses(5, Pt3::new(4.5, 3.0, 0.0), 20.0, 0.4);
//! let views = planar::project_views(&k, &board, &poses).unwrap();
//! assert_eq!(views.len(), 5);
//! ```

pub mod noise;
pub mod planar;
