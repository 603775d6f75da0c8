use nalgebra::{Point3, Vector3};

use crate::traits::{Scalar, StepOutcome, Stepper};
use crate::tracks::FreeVector;

/// Moves free track parameters along straight lines.
///
/// A requested step is shortened to `max_step` and to whatever is left of
/// the path limit; once the limit is used up every further step aborts.
#[derive(Debug, Clone)]
pub struct StraightLineStepper<T: Scalar> {
    track: FreeVector<T>,
    path_length: T,
    max_step: Option<T>,
    path_limit: Option<T>,
}

impl<T: Scalar> StraightLineStepper<T> {
    pub fn new(track: FreeVector<T>) -> Self {
        Self {
            track,
            path_length: T::zero(),
            max_step: None,
            path_limit: None,
        }
    }

    pub fn with_max_step(mut self, max_step: T) -> Self {
        self.max_step = Some(max_step);
        self
    }

    pub fn with_path_limit(mut self, path_limit: T) -> Self {
        self.path_limit = Some(path_limit);
        self
    }

    pub fn track(&self) -> &FreeVector<T> {
        &self.track
    }

    /// Total path travelled so far.
    pub fn path_length(&self) -> T {
        self.path_length
    }
}

impl<T: Scalar> Stepper<T> for StraightLineStepper<T> {
    fn position(&self) -> Point3<T> {
        self.track.pos()
    }

    fn direction(&self) -> Vector3<T> {
        self.track.dir()
    }

    fn step(&mut self, distance: T) -> StepOutcome<T> {
        let mut h = distance;
        if let Some(max_step) = self.max_step {
            h = h.min(max_step);
        }
        if let Some(limit) = self.path_limit {
            let left = limit - self.path_length;
            if left <= T::zero() {
                return StepOutcome::Abort;
            }
            h = h.min(left);
        }
        let pos = self.track.pos() + self.track.dir() * h;
        self.track.set_pos(&pos);
        self.path_length += h;
        StepOutcome::Advanced(h)
    }
}
