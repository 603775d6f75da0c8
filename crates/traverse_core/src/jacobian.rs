//! Conversions between bound and free track parameters and their Jacobians.
//!
//! Every function is a pure evaluation: frame-specific position derivatives
//! come from the [`CoordinateFrame`], the angular blocks are the closed-form
//! spherical derivatives, and nothing is cached between calls.
//!
//! Two configurations are singular: `sin(theta) == 0` in
//! [`JacobianEngine::free_to_bound_jacobian`] and a direction lying in the
//! measurement plane in [`JacobianEngine::free_to_path_correction`]. The plain
//! functions return the non-finite values; the `try_` variants check for them.

use nalgebra::{Dim, Matrix, RawStorage};

use crate::error::JacobianError;
use crate::frames::CoordinateFrame;
use crate::masks::Mask;
use crate::tracks::{
    bound, free, phi, theta, BoundToFreeMatrix, BoundVector, FreeToBoundMatrix, FreeToPathMatrix,
    FreeVector,
};
use crate::traits::Scalar;
use crate::transform::Transform3;

/// Position of the first non-finite entry, if any.
pub fn first_non_finite<T, R, C, S>(m: &Matrix<T, R, C, S>) -> Option<(usize, usize)>
where
    T: Scalar,
    R: Dim,
    C: Dim,
    S: RawStorage<T, R, C>,
{
    for col in 0..m.ncols() {
        for row in 0..m.nrows() {
            if !m[(row, col)].is_finite() {
                return Some((row, col));
            }
        }
    }
    None
}

pub fn is_finite<T, R, C, S>(m: &Matrix<T, R, C, S>) -> bool
where
    T: Scalar,
    R: Dim,
    C: Dim,
    S: RawStorage<T, R, C>,
{
    first_non_finite(m).is_none()
}

/// Stateless Jacobian evaluation for one surface frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JacobianEngine<F> {
    frame: F,
}

impl<F> JacobianEngine<F> {
    pub fn new(frame: F) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }
}

impl<F> JacobianEngine<F> {
    pub fn free_to_bound_vector<T>(
        &self,
        trf: &Transform3<T>,
        free_vec: &FreeVector<T>,
    ) -> BoundVector<T>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
    {
        let dir = free_vec.dir();
        let local = self.frame.global_to_local(trf, &free_vec.pos(), &dir);
        BoundVector::new(local, phi(&dir), theta(&dir), free_vec.qop(), free_vec.time())
    }

    pub fn bound_to_free_vector<T, M>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        bound_vec: &BoundVector<T>,
    ) -> FreeVector<T>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
        M: Mask<T>,
    {
        let dir = bound_vec.dir();
        let pos = self.frame.local_to_global(trf, mask, &bound_vec.local(), &dir);
        FreeVector::new(pos, bound_vec.time(), dir, bound_vec.qop())
    }

    /// `d(free) / d(bound)`, 8×6.
    pub fn bound_to_free_jacobian<T, M>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        bound_vec: &BoundVector<T>,
    ) -> BoundToFreeMatrix<T>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
        M: Mask<T>,
    {
        let mut jac = BoundToFreeMatrix::<T>::zeros();

        let (sin_theta, cos_theta) = bound_vec.theta().sin_cos();
        let (sin_phi, cos_phi) = bound_vec.phi().sin_cos();

        let dir = bound_vec.dir();
        let pos = self.frame.local_to_global(trf, mask, &bound_vec.local(), &dir);

        let dpos = self
            .frame
            .bound_pos_to_free_pos_derivative(trf, mask, &pos, &dir);
        jac.fixed_view_mut::<3, 2>(free::POS0, bound::LOC0)
            .copy_from(&dpos);

        jac[(free::TIME, bound::TIME)] = T::one();

        // d(n_x, n_y, n_z) / d(phi, theta)
        jac[(free::DIR0, bound::PHI)] = -sin_theta * sin_phi;
        jac[(free::DIR0, bound::THETA)] = cos_theta * cos_phi;
        jac[(free::DIR1, bound::PHI)] = sin_theta * cos_phi;
        jac[(free::DIR1, bound::THETA)] = cos_theta * sin_phi;
        jac[(free::DIR2, bound::THETA)] = -sin_theta;

        jac[(free::QOVERP, bound::QOVERP)] = T::one();

        jac
    }

    /// `d(bound) / d(free)`, 6×8. Contains non-finite entries when the
    /// direction is parallel to the global z axis.
    pub fn free_to_bound_jacobian<T, M>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        free_vec: &FreeVector<T>,
    ) -> FreeToBoundMatrix<T>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
        M: Mask<T>,
    {
        let mut jac = FreeToBoundMatrix::<T>::zeros();

        let pos = free_vec.pos();
        let dir = free_vec.dir();

        let (sin_theta, cos_theta) = theta(&dir).sin_cos();
        let (sin_phi, cos_phi) = phi(&dir).sin_cos();

        let dloc = self
            .frame
            .free_pos_to_bound_pos_derivative(trf, mask, &pos, &dir);
        jac.fixed_view_mut::<2, 3>(bound::LOC0, free::POS0)
            .copy_from(&dloc);

        jac[(bound::TIME, free::TIME)] = T::one();

        // d(phi, theta) / d(n_x, n_y, n_z)
        jac[(bound::PHI, free::DIR0)] = -sin_phi / sin_theta;
        jac[(bound::PHI, free::DIR1)] = cos_phi / sin_theta;
        jac[(bound::THETA, free::DIR0)] = cos_phi * cos_theta;
        jac[(bound::THETA, free::DIR1)] = sin_phi * cos_theta;
        jac[(bound::THETA, free::DIR2)] = -sin_theta;

        jac[(bound::QOVERP, free::QOVERP)] = T::one();

        jac
    }

    /// Derivative of the path length to the surface with respect to the
    /// free parameters, 1×8. Non-finite when the direction lies in the
    /// measurement plane.
    pub fn free_to_path_correction<T, M>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        free_vec: &FreeVector<T>,
    ) -> FreeToPathMatrix<T>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
        M: Mask<T>,
    {
        let mut correction = FreeToPathMatrix::<T>::zeros();

        let pos = free_vec.pos();
        let dir = free_vec.dir();

        let frame = self.frame.reference_frame(trf, mask, &pos, &dir);
        let z_axis = frame.column(2);
        let dz = z_axis.dot(&dir);

        correction
            .fixed_view_mut::<1, 3>(0, free::POS0)
            .copy_from(&(z_axis.transpose() * (-dz.recip())));

        correction
    }

    pub fn try_free_to_bound_jacobian<T, M>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        free_vec: &FreeVector<T>,
    ) -> Result<FreeToBoundMatrix<T>, JacobianError>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
        M: Mask<T>,
    {
        let dir = free_vec.dir();
        if dir.x == T::zero() && dir.y == T::zero() {
            return Err(JacobianError::PolarSingularity);
        }
        let jac = self.free_to_bound_jacobian(trf, mask, free_vec);
        match first_non_finite(&jac) {
            Some((row, col)) => Err(JacobianError::NonFinite {
                what: "free-to-bound Jacobian",
                row,
                col,
            }),
            None => Ok(jac),
        }
    }

    pub fn try_free_to_path_correction<T, M>(
        &self,
        trf: &Transform3<T>,
        mask: &M,
        free_vec: &FreeVector<T>,
    ) -> Result<FreeToPathMatrix<T>, JacobianError>
    where
        T: Scalar,
        F: CoordinateFrame<T>,
        M: Mask<T>,
    {
        let correction = self.free_to_path_correction(trf, mask, free_vec);
        if is_finite(&correction) {
            Ok(correction)
        } else {
            Err(JacobianError::TangentialDirection)
        }
    }
}
