//! Local-coordinate validity bounds of surfaces.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::traits::Scalar;

/// Bounds of a surface in its own local coordinates.
pub trait Mask<T: Scalar> {
    fn is_inside(&self, local: &Point2<T>, tolerance: T) -> bool;

    /// Radius of the surface for frames whose embedding depends on it.
    fn radius(&self) -> Option<T> {
        None
    }
}

/// Rectangle of half lengths `half_x`, `half_y` in cartesian `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle2<T> {
    pub half_x: T,
    pub half_y: T,
}

impl<T: Scalar> Mask<T> for Rectangle2<T> {
    fn is_inside(&self, local: &Point2<T>, tolerance: T) -> bool {
        within(local.x, self.half_x, tolerance) && within(local.y, self.half_y, tolerance)
    }
}

/// Annulus `inner <= r <= outer` in polar `(r, phi)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ring2<T> {
    pub inner: T,
    pub outer: T,
}

impl<T: Scalar> Mask<T> for Ring2<T> {
    fn is_inside(&self, local: &Point2<T>, tolerance: T) -> bool {
        local.x + tolerance >= self.inner && local.x <= self.outer + tolerance
    }
}

/// Cylinder barrel of `radius` spanning `|z| <= half_z` in `(r * phi, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder2<T> {
    pub radius: T,
    pub half_z: T,
}

impl<T: Scalar> Mask<T> for Cylinder2<T> {
    fn is_inside(&self, local: &Point2<T>, tolerance: T) -> bool {
        within(local.y, self.half_z, tolerance)
    }

    fn radius(&self) -> Option<T> {
        Some(self.radius)
    }
}

/// Accepts every local point; used for surfaces without bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Unbounded;

impl<T: Scalar> Mask<T> for Unbounded {
    fn is_inside(&self, _local: &Point2<T>, _tolerance: T) -> bool {
        true
    }
}

/// `|value| <= half + tolerance`
fn within<T: Scalar>(value: T, half: T, tolerance: T) -> bool {
    value <= half + tolerance && -value <= half + tolerance
}
