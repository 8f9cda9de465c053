//! Observation types for calibration data.
//!
//! This module provides the canonical data structure for storing 2D-3D point
//! correspondences of a single view of a planar target.

use crate::{Pt2, Pt3, Real};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// A single view containing 2D-3D point correspondences.
///
/// `points_3d[i]` is the target-frame location of the feature observed at
/// pixel `points_2d[i]`. For a planar target every `points_3d[i].z` is zero.
///
/// # Example
///
/// ```
/// use planar_calib_core::{CorrespondenceView, Pt2, Pt3};
///
/// let points_3d = vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(0.1, 0.0, 0.0)];
/// let points_2d = vec![Pt2::new(320.0, 240.0), Pt2::new(400.0, 240.0)];
/// let view = CorrespondenceView::new(points_3d, points_2d).unwrap();
///
/// assert_eq!(view.len(), 2);
/// assert!(view.is_planar(1e-12));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceView {
    /// 3D points in the target frame.
    pub points_3d: Vec<Pt3>,
    /// Corresponding 2D pixel observations.
    pub points_2d: Vec<Pt2>,
}

impl CorrespondenceView {
    /// Construct a correspondence set.
    ///
    /// # Errors
    ///
    /// Returns an error if the 3D and 2D point counts don't match.
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Pt2>) -> Result<Self> {
        ensure!(
            points_3d.len() == points_2d.len(),
            "3D / 2D point counts must match: {} vs {}",
            points_3d.len(),
            points_2d.len()
        );
        Ok(Self {
            points_3d,
            points_2d,
        })
    }

    /// Target points with the `z` coordinate dropped.
    pub fn planar_points(&self) -> Vec<Pt2> {
        self.points_3d
            .iter()
            .map(|p3| Pt2::new(p3.x, p3.y))
            .collect()
    }

    /// `true` if every target point lies on `z = 0` within `tol`.
    pub fn is_planar(&self, tol: Real) -> bool {
        self.points_3d.iter().all(|p| p.z.abs() <= tol)
    }

    /// Number of point correspondences in this view.
    #[inline]
    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    /// Returns true if this view has no correspondences.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }
}
