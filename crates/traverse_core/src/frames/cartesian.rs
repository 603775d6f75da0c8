use nalgebra::{Matrix3, Point2, Point3, Vector3};

use super::CoordinateFrame;
use crate::masks::Mask;
use crate::traits::Scalar;
use crate::transform::Transform3;

/// Planar surface with local `(x, y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cartesian2;

impl<T: Scalar> CoordinateFrame<T> for Cartesian2 {
    fn project(&self, local3: &Point3<T>) -> Point2<T> {
        Point2::new(local3.x, local3.y)
    }

    fn local_to_global<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        _mask: &M,
        local: &Point2<T>,
        _dir: &Vector3<T>,
    ) -> Point3<T> {
        trf.point_to_global(&Point3::new(local.x, local.y, T::zero()))
    }

    fn reference_frame<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        _mask: &M,
        _pos: &Point3<T>,
        _dir: &Vector3<T>,
    ) -> Matrix3<T> {
        *trf.rotation()
    }
}
