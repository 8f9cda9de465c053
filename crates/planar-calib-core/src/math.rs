//! Mathematical utilities and type definitions.
//!
//! This module provides fundamental types used throughout the workspace
//! and small helpers for homogeneous coordinates.

use nalgebra::{Isometry3, Matrix3, Point2, Point3, Vector2, Vector3};

/// Scalar type used throughout the workspace (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Convert a 2D point in Euclidean coordinates into homogeneous coordinates.
///
/// Given a point `p = (x, y)`, returns the homogeneous vector `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Convert a 3D homogeneous vector back to a 2D point.
///
/// Returns `None` when the homogeneous scale is zero or not finite.
pub fn from_homogeneous(v: &Vec3) -> Option<Pt2> {
    if v.z.abs() <= Real::EPSILON || !v.z.is_finite() {
        return None;
    }
    Some(Pt2::new(v.x / v.z, v.y / v.z))
}

/// Frobenius distance between two matrices after normalizing both to unit
/// Frobenius norm and resolving the sign ambiguity.
///
/// This is the natural comparison for matrices defined up to a nonzero scale,
/// such as homographies.
pub fn projective_distance(a: &Mat3, b: &Mat3) -> Real {
    let na = a.norm();
    let nb = b.norm();
    if na <= Real::EPSILON || nb <= Real::EPSILON {
        return Real::INFINITY;
    }
    let a = a / na;
    let b = b / nb;
    (a - b).norm().min((a + b).norm())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_roundtrip() {
        let p = Pt2::new(3.0, -2.0);
        let h = to_homogeneous(&p) * 4.0;
        let back = from_homogeneous(&h).unwrap();
        assert!((back - p).norm() < 1e-12);
    }

    #[test]
    fn point_at_infinity_has_no_euclidean_form() {
        assert!(from_homogeneous(&Vec3::new(1.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn projective_distance_ignores_scale_and_sign() {
        let a = Mat3::new(1.0, 2.0, 3.0, 0.5, -1.0, 4.0, 0.1, 0.2, 1.0);
        assert!(projective_distance(&a, &(a * -7.5)) < 1e-12);
        assert!(projective_distance(&a, &Mat3::identity()) > 0.1);
    }
}
