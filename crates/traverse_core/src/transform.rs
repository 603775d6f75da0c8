use nalgebra::{Matrix3, Point3, Vector3};

use crate::traits::Scalar;

/// Rigid placement of a surface: `global = R * local + t`.
///
/// The columns of `R` are the local x, y and z axes expressed in the global
/// frame; for planar surfaces the local z axis is the surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3<T: Scalar> {
    rotation: Matrix3<T>,
    translation: Vector3<T>,
}

impl<T: Scalar> Default for Transform3<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: Scalar> Transform3<T> {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn from_translation(translation: Vector3<T>) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation,
        }
    }

    /// Place the local frame at `translation` with local z along `z_axis`
    /// and local x along the component of `x_axis` orthogonal to it.
    pub fn from_axes(translation: Vector3<T>, z_axis: Vector3<T>, x_axis: Vector3<T>) -> Self {
        let z = z_axis.normalize();
        let x = (x_axis - z * z.dot(&x_axis)).normalize();
        let y = z.cross(&x);
        Self {
            rotation: Matrix3::from_columns(&[x, y, z]),
            translation,
        }
    }

    pub fn rotation(&self) -> &Matrix3<T> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<T> {
        &self.translation
    }

    pub fn point_to_global(&self, p: &Point3<T>) -> Point3<T> {
        Point3::from(self.rotation * p.coords + self.translation)
    }

    pub fn point_to_local(&self, p: &Point3<T>) -> Point3<T> {
        Point3::from(self.rotation.tr_mul(&(p.coords - self.translation)))
    }

    pub fn vector_to_global(&self, v: &Vector3<T>) -> Vector3<T> {
        self.rotation * v
    }

    pub fn vector_to_local(&self, v: &Vector3<T>) -> Vector3<T> {
        self.rotation.tr_mul(v)
    }
}
