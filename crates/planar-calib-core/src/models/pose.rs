use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::{Iso3, Mat3, Pt3, Real, Vec3};

/// Largest `‖RᵀR − I‖_F` accepted when reading a pose from serialized data.
const ROTATION_TOL: Real = 1e-6;

/// Pose of the planar target in the camera frame (`T_C_B`).
///
/// Maps board coordinates into camera coordinates: `X_c = R * X_b + t`.
/// The rotation is a proper rotation (`RᵀR = I`, `det R = +1`). [`Extrinsics::new`]
/// trusts its caller; deserialization checks it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExtrinsics")]
pub struct Extrinsics {
    rotation: Rotation3<Real>,
    translation: Vec3,
}

#[derive(Deserialize)]
struct RawExtrinsics {
    rotation: Rotation3<Real>,
    translation: Vec3,
}

impl TryFrom<RawExtrinsics> for Extrinsics {
    type Error = String;

    fn try_from(raw: RawExtrinsics) -> Result<Self, Self::Error> {
        let pose = Extrinsics::new(raw.rotation, raw.translation);
        let err = pose.orthonormality_error();
        let det = pose.rotation_matrix().determinant();
        if !(err <= ROTATION_TOL && det > 0.0) {
            return Err(format!(
                "rotation is not proper (orthonormality error {err:.3e}, det {det:.6})"
            ));
        }
        if !raw.translation.iter().all(|v| v.is_finite()) {
            return Err("translation is not finite".to_string());
        }
        Ok(pose)
    }
}

impl Extrinsics {
    pub fn new(rotation: Rotation3<Real>, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_iso(iso: &Iso3) -> Self {
        Self::new(iso.rotation.to_rotation_matrix(), iso.translation.vector)
    }

    pub fn to_iso(&self) -> Iso3 {
        Iso3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&self.rotation),
        )
    }

    /// Rotation as a plain 3x3 matrix.
    pub fn rotation_matrix(&self) -> Mat3 {
        *self.rotation.matrix()
    }

    pub fn rotation(&self) -> &Rotation3<Real> {
        &self.rotation
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Transform a board point into the camera frame.
    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        self.rotation * p + self.translation
    }

    /// `‖RᵀR − I‖_F`.
    pub fn orthonormality_error(&self) -> Real {
        let r = self.rotation_matrix();
        (r.transpose() * r - Mat3::identity()).norm()
    }

    /// Angle in radians of the relative rotation between two poses, in `[0, π]`.
    ///
    /// Uses `atan2(sin, cos)` of the relative rotation, so nearly equal
    /// rotations give a small finite angle rather than `acos` of a value
    /// just above one.
    pub fn rotation_angle_to(&self, other: &Extrinsics) -> Real {
        let rel = self.rotation_matrix().transpose() * other.rotation_matrix();
        let cos = 0.5 * (rel.trace() - 1.0);
        let sin = 0.5
            * Vec3::new(
                rel[(2, 1)] - rel[(1, 2)],
                rel[(0, 2)] - rel[(2, 0)],
                rel[(1, 0)] - rel[(0, 1)],
            )
            .norm();
        sin.atan2(cos)
    }
}
