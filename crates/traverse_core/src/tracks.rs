//! Track-state vectors in the bound (surface-local) and free (global)
//! parameterizations.

use nalgebra::{Point2, Point3, SMatrix, SVector, Vector3};

use crate::traits::{lit, Scalar};

pub const BOUND_SIZE: usize = 6;
pub const FREE_SIZE: usize = 8;

/// Component indices of a [`BoundVector`].
pub mod bound {
    pub const LOC0: usize = 0;
    pub const LOC1: usize = 1;
    pub const PHI: usize = 2;
    pub const THETA: usize = 3;
    pub const QOVERP: usize = 4;
    pub const TIME: usize = 5;
}

/// Component indices of a [`FreeVector`].
pub mod free {
    pub const POS0: usize = 0;
    pub const POS1: usize = 1;
    pub const POS2: usize = 2;
    pub const TIME: usize = 3;
    pub const DIR0: usize = 4;
    pub const DIR1: usize = 5;
    pub const DIR2: usize = 6;
    pub const QOVERP: usize = 7;
}

pub type BoundToFreeMatrix<T> = SMatrix<T, FREE_SIZE, BOUND_SIZE>;
pub type FreeToBoundMatrix<T> = SMatrix<T, BOUND_SIZE, FREE_SIZE>;
pub type FreeToPathMatrix<T> = SMatrix<T, 1, FREE_SIZE>;

/// Unit direction from spherical angles.
pub fn direction_from_angles<T: Scalar>(phi: T, theta: T) -> Vector3<T> {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector3::new(cos_phi * sin_theta, sin_phi * sin_theta, cos_theta)
}

/// Azimuth of `dir` in `(-pi, pi]`.
pub fn phi<T: Scalar>(dir: &Vector3<T>) -> T {
    dir.y.atan2(dir.x)
}

/// Polar angle of `dir` in `[0, pi]`.
pub fn theta<T: Scalar>(dir: &Vector3<T>) -> T {
    (dir.x * dir.x + dir.y * dir.y).sqrt().atan2(dir.z)
}

/// `[loc0, loc1, phi, theta, qOverP, time]` on a specific surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundVector<T: Scalar>(pub SVector<T, BOUND_SIZE>);

impl<T: Scalar> BoundVector<T> {
    pub fn new(local: Point2<T>, phi: T, theta: T, qop: T, time: T) -> Self {
        Self(SVector::from([local.x, local.y, phi, theta, qop, time]))
    }

    pub fn local(&self) -> Point2<T> {
        Point2::new(self.0[bound::LOC0], self.0[bound::LOC1])
    }

    pub fn phi(&self) -> T {
        self.0[bound::PHI]
    }

    pub fn theta(&self) -> T {
        self.0[bound::THETA]
    }

    pub fn dir(&self) -> Vector3<T> {
        direction_from_angles(self.phi(), self.theta())
    }

    pub fn qop(&self) -> T {
        self.0[bound::QOVERP]
    }

    pub fn time(&self) -> T {
        self.0[bound::TIME]
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// `[pos0, pos1, pos2, time, dir0, dir1, dir2, qOverP]` in the global frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeVector<T: Scalar>(pub SVector<T, FREE_SIZE>);

impl<T: Scalar> FreeVector<T> {
    pub fn new(pos: Point3<T>, time: T, dir: Vector3<T>, qop: T) -> Self {
        Self(SVector::from([
            pos.x, pos.y, pos.z, time, dir.x, dir.y, dir.z, qop,
        ]))
    }

    /// Build from a momentum vector and charge; the direction is normalized
    /// and `qOverP = charge / |p|`.
    pub fn from_momentum(pos: Point3<T>, time: T, mom: Vector3<T>, charge: T) -> Self {
        let p = mom.norm();
        Self::new(pos, time, mom / p, charge / p)
    }

    pub fn pos(&self) -> Point3<T> {
        Point3::new(self.0[free::POS0], self.0[free::POS1], self.0[free::POS2])
    }

    pub fn set_pos(&mut self, pos: &Point3<T>) {
        self.0[free::POS0] = pos.x;
        self.0[free::POS1] = pos.y;
        self.0[free::POS2] = pos.z;
    }

    pub fn dir(&self) -> Vector3<T> {
        Vector3::new(self.0[free::DIR0], self.0[free::DIR1], self.0[free::DIR2])
    }

    pub fn set_dir(&mut self, dir: &Vector3<T>) {
        self.0[free::DIR0] = dir.x;
        self.0[free::DIR1] = dir.y;
        self.0[free::DIR2] = dir.z;
    }

    pub fn time(&self) -> T {
        self.0[free::TIME]
    }

    pub fn qop(&self) -> T {
        self.0[free::QOVERP]
    }

    pub fn set_qop(&mut self, qop: T) {
        self.0[free::QOVERP] = qop;
    }

    /// Charge over transverse momentum.
    pub fn qop_t(&self) -> T {
        let dir = self.dir();
        self.qop() / (dir.x * dir.x + dir.y * dir.y).sqrt()
    }

    /// Charge over longitudinal momentum.
    pub fn qop_z(&self) -> T {
        self.qop() / self.dir().z
    }

    /// Absolute momentum for a particle of charge `q`.
    pub fn p(&self, q: T) -> T {
        nalgebra::ComplexField::abs(q / self.qop())
    }

    pub fn mom(&self, q: T) -> Vector3<T> {
        self.dir() * self.p(q)
    }

    pub fn pt(&self, q: T) -> T {
        let dir = self.dir();
        self.p(q) * (dir.x * dir.x + dir.y * dir.y).sqrt()
    }

    pub fn pz(&self, q: T) -> T {
        nalgebra::ComplexField::abs(self.p(q) * self.dir().z)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: T) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| nalgebra::ComplexField::abs(*a - *b) <= tolerance)
    }
}

/// Origin-centred fan of unit-momentum tracks: theta sampled in `]0, pi[`,
/// phi in `[-pi, pi[`, charge `-1`.
pub fn ray_fan<T: Scalar>(theta_steps: usize, phi_steps: usize) -> Vec<FreeVector<T>> {
    let origin = Point3::origin();
    let theta_min = lit::<T>(0.001);
    let mut tracks = Vec::with_capacity(theta_steps * phi_steps);
    for itheta in 0..theta_steps {
        let theta = theta_min
            + lit::<T>(itheta as f64) * (T::pi() - theta_min) / lit::<T>(theta_steps as f64);
        for iphi in 0..phi_steps {
            let phi = -T::pi() + lit::<T>(iphi as f64) * T::two_pi() / lit::<T>(phi_steps as f64);
            let dir = direction_from_angles(phi, theta);
            tracks.push(FreeVector::from_momentum(origin, T::zero(), dir, -T::one()));
        }
    }
    tracks
}
