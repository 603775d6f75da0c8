use nalgebra::{Matrix2x3, Matrix3, Matrix3x2, Point2, Point3, Vector3};

use super::CoordinateFrame;
use crate::masks::Mask;
use crate::traits::Scalar;
use crate::transform::Transform3;

/// Planar surface (disc) with local `(r, phi)`. The position derivatives are
/// singular at `r = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Polar2;

impl Polar2 {
    /// Global images of the local radial unit vector and of `d/dphi`.
    fn local_tangents<T: Scalar>(
        trf: &Transform3<T>,
        local: &Point2<T>,
    ) -> (Vector3<T>, Vector3<T>) {
        let r = local.x;
        let (sin_phi, cos_phi) = local.y.sin_cos();
        let radial = trf.vector_to_global(&Vector3::new(cos_phi, sin_phi, T::zero()));
        let azimuthal = trf.vector_to_global(&Vector3::new(-r * sin_phi, r * cos_phi, T::zero()));
        (radial, azimuthal)
    }
}

impl<T: Scalar> CoordinateFrame<T> for Polar2 {
    fn project(&self, local3: &Point3<T>) -> Point2<T> {
        Point2::new(
            (local3.x * local3.x + local3.y * local3.y).sqrt(),
            local3.y.atan2(local3.x),
        )
    }

    fn local_to_global<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        _mask: &M,
        local: &Point2<T>,
        _dir: &Vector3<T>,
    ) -> Point3<T> {
        let (sin_phi, cos_phi) = local.y.sin_cos();
        trf.point_to_global(&Point3::new(local.x * cos_phi, local.x * sin_phi, T::zero()))
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

    fn bound_pos_to_free_pos_derivative<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        _mask: &M,
        pos: &Point3<T>,
        dir: &Vector3<T>,
    ) -> Matrix3x2<T> {
        let local = self.global_to_local(trf, pos, dir);
        let (radial, azimuthal) = Self::local_tangents(trf, &local);
        Matrix3x2::from_columns(&[radial, azimuthal])
    }

    fn free_pos_to_bound_pos_derivative<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        _mask: &M,
        pos: &Point3<T>,
        dir: &Vector3<T>,
    ) -> Matrix2x3<T> {
        let local = self.global_to_local(trf, pos, dir);
        let (radial, azimuthal) = Self::local_tangents(trf, &local);
        // |d/dphi| = r, so its dual row is scaled by 1 / r^2.
        let inv_r2 = (local.x * local.x).recip();
        Matrix2x3::from_rows(&[radial.transpose(), (azimuthal * inv_r2).transpose()])
    }
}
