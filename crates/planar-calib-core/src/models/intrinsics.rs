use nalgebra::{Matrix3, RealField, Vector2};
use serde::{Deserialize, Serialize};

use crate::{Mat3, Real};

/// Standard pinhole intrinsics with optional skew.
///
/// The matrix form is upper triangular:
///
/// ```text
///     | fx  skew  cx |
/// K = |  0   fy   cy |
///     |  0    0    1 |
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxFyCxCySkew<S: RealField + Copy> {
    /// Focal length in pixels along X.
    pub fx: S,
    /// Focal length in pixels along Y.
    pub fy: S,
    /// Principal point X coordinate in pixels.
    pub cx: S,
    /// Principal point Y coordinate in pixels.
    pub cy: S,
    /// Skew term (typically 0).
    pub skew: S,
}

impl<S: RealField + Copy> FxFyCxCySkew<S> {
    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Matrix3<S> {
        Matrix3::new(
            self.fx,
            self.skew,
            self.cx,
            S::zero(),
            self.fy,
            self.cy,
            S::zero(),
            S::zero(),
            S::one(),
        )
    }

    /// Map normalized image coordinates (`Z = 1` plane) to pixels.
    pub fn normalized_to_pixel(&self, n: &Vector2<S>) -> Vector2<S> {
        let u = self.fx * n.x + self.skew * n.y + self.cx;
        let v = self.fy * n.y + self.cy;
        Vector2::new(u, v)
    }

    /// Map pixels to normalized image coordinates.
    pub fn pixel_to_normalized(&self, pixel: &Vector2<S>) -> Vector2<S> {
        let ny = (pixel.y - self.cy) / self.fy;
        let nx = (pixel.x - self.cx - self.skew * ny) / self.fx;
        Vector2::new(nx, ny)
    }
}

impl FxFyCxCySkew<Real> {
    /// Read intrinsics from an upper-triangular K, normalizing by `K[2,2]`.
    ///
    /// Returns `None` if `K[2,2]` is zero.
    pub fn from_k_matrix(k: &Mat3) -> Option<Self> {
        let s = k[(2, 2)];
        if s.abs() <= Real::EPSILON {
            return None;
        }
        Some(Self {
            fx: k[(0, 0)] / s,
            fy: k[(1, 1)] / s,
            cx: k[(0, 2)] / s,
            cy: k[(1, 2)] / s,
            skew: k[(0, 1)] / s,
        })
    }

    /// `true` when both focal lengths are positive and every entry is finite.
    pub fn is_valid(&self) -> bool {
        let finite = [self.fx, self.fy, self.cx, self.cy, self.skew]
            .iter()
            .all(|v| v.is_finite());
        finite && self.fx > 0.0 && self.fy > 0.0
    }
}
