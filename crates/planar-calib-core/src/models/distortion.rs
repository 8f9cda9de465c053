use nalgebra::RealField;
use serde::{Deserialize, Serialize};

/// Brown-Conrady lens distortion coefficients.
///
/// The closed-form planar solver assumes a distortion-free pinhole camera, so
/// every estimate it produces carries zero coefficients. The type exists so
/// that results can be reported and compared against external calibrators
/// that do estimate lens distortion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5<S: RealField> {
    pub k1: S,
    pub k2: S,
    pub k3: S,
    pub p1: S,
    pub p2: S,
}

impl<S: RealField + Copy> BrownConrady5<S> {
    /// All coefficients zero (pure pinhole).
    pub fn zero() -> Self {
        Self {
            k1: S::zero(),
            k2: S::zero(),
            k3: S::zero(),
            p1: S::zero(),
            p2: S::zero(),
        }
    }

    /// Coefficients in OpenCV order `(k1, k2, p1, p2, k3)`.
    pub fn to_opencv(&self) -> [S; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn from_opencv(c: [S; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }
}
