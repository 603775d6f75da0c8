use nalgebra::{Point3, RealField, Vector3};
use num_traits::ToPrimitive;

use crate::navigation::Intersection;

/// A trait for types that can be used as scalars in binning, frames and Jacobians.
/// Any real float nalgebra can do dense algebra with (`f32`, `f64`) qualifies.
pub trait Scalar: RealField + Copy + ToPrimitive {}

impl<T: RealField + Copy + ToPrimitive> Scalar for T {}

/// Lossless-enough conversion of a literal into the working scalar.
#[inline]
pub fn lit<T: Scalar>(value: f64) -> T {
    nalgebra::convert(value)
}

/// Supplies the candidate surfaces of a volume for a track at a given position.
///
/// Implementations own the surface-intersection algorithms; the navigator only
/// sorts and consumes what is reported here.
pub trait Geometry<T: Scalar> {
    /// Number of volumes; valid volume indices are `0..volume_count()`.
    fn volume_count(&self) -> usize;

    /// Intersect the straight line `pos + s * dir` with the surfaces the
    /// volume exposes and push the hits into `out` (which is not cleared).
    /// `window` is the bin neighbourhood searched in binned surface grids.
    /// Hits behind the track may be reported; the navigator filters them.
    fn candidates(
        &self,
        volume: usize,
        pos: &Point3<T>,
        dir: &Vector3<T>,
        window: [usize; 2],
        out: &mut Vec<Intersection<T>>,
    );
}

/// Outcome of asking a stepper to advance the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome<T> {
    /// The track moved by the given path length.
    Advanced(T),
    /// The stepper refuses to continue (e.g. its path limit was reached).
    Abort,
}

/// Owns the track position/direction and decides the actual step size.
pub trait Stepper<T: Scalar> {
    fn position(&self) -> Point3<T>;

    /// Unit direction of motion.
    fn direction(&self) -> Vector3<T>;

    /// Advance towards a target `distance` away. The stepper may travel less
    /// than requested but never more.
    fn step(&mut self, distance: T) -> StepOutcome<T>;
}
