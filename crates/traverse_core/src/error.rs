//! Typed errors for axis construction, Jacobian evaluation and parity checks.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AxisError {
    #[error("Axis bounds must be finite with max > min (got min = {min}, max = {max}).")]
    InvalidBounds { min: f64, max: f64 },
    #[error("Axis needs at least one bin.")]
    NoBins,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JacobianError {
    /// `sin(theta) == 0`: the direction is parallel to the global z axis and
    /// phi is undefined.
    #[error("Direction is parallel to the polar axis; d(phi)/d(dir) is singular.")]
    PolarSingularity,
    /// The direction lies in the measurement plane (`dz == 0`).
    #[error("Direction is tangential to the surface; path correction is singular.")]
    TangentialDirection,
    #[error("Non-finite entry in {what} at ({row}, {col}).")]
    NonFinite {
        what: &'static str,
        row: usize,
        col: usize,
    },
}

/// First discrepancy found when diffing two propagation runs of one batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParityError {
    #[error("Track count differs: {expected} vs {actual}.")]
    TrackCount { expected: usize, actual: usize },
    #[error("Track {track}: step count differs ({expected} vs {actual}).")]
    StepCount {
        track: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Track {track}, step {step}: volume {expected} vs {actual}.")]
    Volume {
        track: usize,
        step: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Track {track}, step {step}: positions differ by {deviation:e} (tolerance {tolerance:e}).")]
    Position {
        track: usize,
        step: usize,
        deviation: f64,
        tolerance: f64,
    },
    #[error("Track {track}: terminal status differs.")]
    Status { track: usize },
}
