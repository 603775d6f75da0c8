pub mod axis;
pub mod error;
pub mod frames;
pub mod jacobian;
pub mod masks;
pub mod navigation;
pub mod parity;
pub mod tracks;
pub mod transform;
/// The `traverse_core` crate bins detector geometry and carries track states through it.
/// Everything numeric is generic over a `Scalar` (`f32` or `f64`).
///
/// Key components:
/// - **Axis**: closed and circular regular axes mapping positions to bins and neighbourhoods, plus `Grid2`.
/// - **Tracks**: bound (surface-local, 6) and free (global, 8) parameter vectors.
/// - **Frames**: cartesian, polar and cylindrical surface frames behind the `CoordinateFrame` trait.
/// - **Jacobian**: `JacobianEngine` for bound↔free conversions, their Jacobians and the path correction.
/// - **Navigation**: the target/status navigator, a barrel `Detector` and a straight-line stepper.
/// - **Parity**: serial vs rayon-parallel propagation of a track batch with a record diff.
pub mod traits;

pub use axis::{Axis, BinRange, Circular, Closed, Grid2};
pub use error::{AxisError, JacobianError, ParityError};
pub use jacobian::JacobianEngine;
pub use navigation::{
    propagate, NavigationConfig, NavigationState, NavigationStatus, Navigator, PropagationRecord,
};
pub use tracks::{BoundVector, FreeVector};
pub use traits::{Geometry, Scalar, StepOutcome, Stepper};
