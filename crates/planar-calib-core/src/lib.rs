//! Core math and geometry primitives for planar camera calibration.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Mat3`, ...),
//! - the pinhole camera model (intrinsics, distortion placeholder, extrinsics),
//! - 2D-3D correspondence sets and reprojection helpers,
//! - deterministic synthetic data generation for tests and demos.
//!
//! Camera pipeline:
//! `pixel = K ∘ project(R * X + t)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera model types.
pub mod models;
/// Synthetic planar datasets.
pub mod synthetic;
/// Observation types.
pub mod types;

pub use math::*;
pub use models::*;
pub use types::*;
