//! Surface coordinate frames.
//!
//! A frame knows how to express a global point in the two local coordinates
//! of a surface, how to embed local coordinates back into 3-D, and which
//! local basis (the reference frame) applies at a point. The Jacobian engine
//! is generic over this trait.

mod cartesian;
mod cylindrical;
mod polar;

pub use cartesian::Cartesian2;
pub use cylindrical::Cylindrical2;
pub use polar::Polar2;

use nalgebra::{Matrix2x3, Matrix3, Matrix3x2, Point2, Point3, Vector3};

use crate::masks::Mask;
use crate::traits::Scalar;
use crate::transform::Transform3;

pub trait CoordinateFrame<T: Scalar> {
    /// Two local coordinates of a point already expressed in the surface's
    /// cartesian frame.
    fn project(&self, local3: &Point3<T>) -> Point2<T>;

    fn global_to_local(&self, trf: &Transform3<T>, pos: &Point3<T>, _dir: &Vector3<T>) -> Point2<T> {
        self.project(&trf.point_to_local(pos))
    }

    fn local_to_global<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        local: &Point2<T>,
        dir: &Vector3<T>,
    ) -> Point3<T>;

    /// Orthonormal local basis at `pos`, columns `(e0, e1, normal)`.
    fn reference_frame<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        pos: &Point3<T>,
        dir: &Vector3<T>,
    ) -> Matrix3<T>;

    /// `d(x, y, z) / d(loc0, loc1)`
    fn bound_pos_to_free_pos_derivative<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        pos: &Point3<T>,
        dir: &Vector3<T>,
    ) -> Matrix3x2<T> {
        self.reference_frame(trf, mask, pos, dir)
            .fixed_columns::<2>(0)
            .into_owned()
    }

    /// `d(loc0, loc1) / d(x, y, z)`
    fn free_pos_to_bound_pos_derivative<M: Mask<T>>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        pos: &Point3<T>,
        dir: &Vector3<T>,
    ) -> Matrix2x3<T> {
        self.reference_frame(trf, mask, pos, dir)
            .fixed_columns::<2>(0)
            .transpose()
    }
}
