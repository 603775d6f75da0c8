use nalgebra::{Matrix3, Point2, Point3, Vector3};

use super::CoordinateFrame;
use crate::masks::Mask;
use crate::traits::{lit, Scalar};
use crate::transform::Transform3;

/// Cylinder about the transform's local z axis with local `(r * phi, z)`.
///
/// The embedding needs the cylinder radius, which is read from the mask;
/// masks without a radius embed to NaN coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cylindrical2;

impl<T: Scalar> CoordinateFrame<T> for Cylindrical2 {
    fn project(&self, local3: &Point3<T>) -> Point2<T> {
        let r = (local3.x * local3.x + local3.y * local3.y).sqrt();
        Point2::new(r * local3.y.atan2(local3.x), local3.z)
    }

    fn local_to_global<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        local: &Point2<T>,
        _dir: &Vector3<T>,
    ) -> Point3<T> {
        let r = mask.radius().unwrap_or_else(|| lit(f64::NAN));
        let (sin_phi, cos_phi) = (local.x / r).sin_cos();
        trf.point_to_global(&Point3::new(r * cos_phi, r * sin_phi, local.y))
    }

    fn reference_frame<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        _mask: &M,
        pos: &Point3<T>,
        _dir: &Vector3<T>,
    ) -> Matrix3<T> {
        let local = trf.point_to_local(pos);
        let (sin_phi, cos_phi) = local.y.atan2(local.x).sin_cos();
        let rphi = Vector3::new(-sin_phi, cos_phi, T::zero());
        let normal = Vector3::new(cos_phi, sin_phi, T::zero());
        trf.rotation() * Matrix3::from_columns(&[rphi, Vector3::z(), normal])
    }
}
