//! Serial vs data-parallel execution of the same propagation batch.
//!
//! Every track owns its navigator state and stepper, so the batch is
//! embarrassingly parallel. [`compare_records`] diffs the two runs.

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::ParityError;
use crate::navigation::{
    propagate, NavigationConfig, Navigator, PropagationRecord, StraightLineStepper,
};
use crate::traits::{Geometry, Scalar};
use crate::tracks::FreeVector;

fn propagate_track<T, G>(
    navigator: &Navigator<'_, G>,
    track: &FreeVector<T>,
    start_volume: usize,
) -> Result<PropagationRecord<T>>
where
    T: Scalar,
    G: Geometry<T>,
{
    let mut stepper = StraightLineStepper::new(*track);
    propagate(navigator, &mut stepper, start_volume)
}

/// Propagate every track one after the other on the calling thread.
pub fn run_serial<T, G>(
    geometry: &G,
    config: NavigationConfig,
    tracks: &[FreeVector<T>],
    start_volume: usize,
) -> Result<Vec<PropagationRecord<T>>>
where
    T: Scalar,
    G: Geometry<T>,
{
    let navigator = Navigator::new(geometry, config);
    debug!(tracks = tracks.len(), "serial propagation");
    tracks
        .iter()
        .map(|track| propagate_track(&navigator, track, start_volume))
        .collect()
}

/// Propagate the batch on the rayon thread pool; output order matches
/// `tracks`.
pub fn run_parallel<T, G>(
    geometry: &G,
    config: NavigationConfig,
    tracks: &[FreeVector<T>],
    start_volume: usize,
) -> Result<Vec<PropagationRecord<T>>>
where
    T: Scalar,
    G: Geometry<T> + Sync,
{
    let navigator = Navigator::new(geometry, config);
    debug!(tracks = tracks.len(), "parallel propagation");
    tracks
        .par_iter()
        .map(|track| propagate_track(&navigator, track, start_volume))
        .collect()
}

/// Check that `other` reproduces `host` track by track: same number of
/// steps, same volumes, same terminal status and positions within
/// `tolerance`. Reports the first discrepancy.
pub fn compare_records<T: Scalar>(
    host: &[PropagationRecord<T>],
    other: &[PropagationRecord<T>],
    tolerance: T,
) -> Result<(), ParityError> {
    let outcome = first_mismatch(host, other, tolerance);
    if let Err(err) = &outcome {
        warn!(%err, "propagation runs disagree");
    }
    outcome
}

fn first_mismatch<T: Scalar>(
    host: &[PropagationRecord<T>],
    other: &[PropagationRecord<T>],
    tolerance: T,
) -> Result<(), ParityError> {
    if host.len() != other.len() {
        return Err(ParityError::TrackCount {
            expected: host.len(),
            actual: other.len(),
        });
    }
    for (track, (expected, actual)) in host.iter().zip(other).enumerate() {
        if expected.len() != actual.len() {
            return Err(ParityError::StepCount {
                track,
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        let steps = expected
            .volumes
            .iter()
            .zip(&expected.positions)
            .zip(actual.volumes.iter().zip(&actual.positions));
        for (step, ((&v0, p0), (&v1, p1))) in steps.enumerate() {
            if v0 != v1 {
                return Err(ParityError::Volume {
                    track,
                    step,
                    expected: v0,
                    actual: v1,
                });
            }
            let deviation = (p0 - p1).norm();
            // NaN deviations count as mismatches.
            if !(deviation <= tolerance) {
                return Err(ParityError::Position {
                    track,
                    step,
                    deviation: deviation.to_f64().unwrap_or(f64::NAN),
                    tolerance: tolerance.to_f64().unwrap_or(f64::NAN),
                });
            }
        }
        if expected.status != actual.status {
            return Err(ParityError::Status { track });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{compare_records, run_parallel, run_serial};
    use crate::error::ParityError;
    use crate::navigation::{Detector, NavigationConfig, NavigationStatus, PropagationRecord};
    use crate::tracks::ray_fan;
    use nalgebra::Point3;

    fn detector() -> Detector<f64> {
        let mut detector =
            Detector::barrel(&[0.0, 20.0, 40.0, 60.0], 100.0, 1e-6).expect("valid barrel");
        detector.add_layer(1, 30.0, 12, 5).expect("layer fits");
        detector.add_layer(2, 50.0, 16, 5).expect("layer fits");
        detector
    }

    fn record(volumes: Vec<usize>, xs: &[f64]) -> PropagationRecord<f64> {
        PropagationRecord {
            volumes,
            positions: xs.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect(),
            status: NavigationStatus::Exited,
        }
    }

    #[test]
    fn serial_and_parallel_runs_agree() {
        let detector = detector();
        let tracks = ray_fan::<f64>(10, 12);
        let config = NavigationConfig::default();
        let host = run_serial(&detector, config, &tracks, 0).expect("serial run");
        let parallel = run_parallel(&detector, config, &tracks, 0).expect("parallel run");

        assert_eq!(host.len(), tracks.len());
        compare_records(&host, &parallel, 1e-12).expect("runs agree");
        for rec in &host {
            assert_eq!(rec.status, NavigationStatus::Exited);
            assert!(rec.volumes.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn invalid_start_volume_fails_both_runs() {
        let detector = detector();
        let tracks = ray_fan::<f64>(2, 2);
        let config = NavigationConfig::default();
        assert!(run_serial(&detector, config, &tracks, 9).is_err());
        assert!(run_parallel(&detector, config, &tracks, 9).is_err());
    }

    #[test]
    fn reports_first_mismatch() {
        let host = vec![record(vec![0, 1], &[1.0, 2.0])];

        assert_eq!(
            compare_records(&host, &[], 1e-9),
            Err(ParityError::TrackCount {
                expected: 1,
                actual: 0
            })
        );
        assert_eq!(
            compare_records(&host, &[record(vec![0], &[1.0])], 1e-9),
            Err(ParityError::StepCount {
                track: 0,
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            compare_records(&host, &[record(vec![0, 2], &[1.0, 2.0])], 1e-9),
            Err(ParityError::Volume {
                track: 0,
                step: 1,
                expected: 1,
                actual: 2
            })
        );
        assert!(matches!(
            compare_records(&host, &[record(vec![0, 1], &[1.0, 2.5])], 1e-9),
            Err(ParityError::Position { track: 0, step: 1, .. })
        ));
        let mut aborted = record(vec![0, 1], &[1.0, 2.0]);
        aborted.status = NavigationStatus::Aborted;
        assert_eq!(
            compare_records(&host, &[aborted], 1e-9),
            Err(ParityError::Status { track: 0 })
        );
        compare_records(&host, &[record(vec![0, 1], &[1.0, 2.0 + 1e-12])], 1e-9)
            .expect("within tolerance");
    }
}
