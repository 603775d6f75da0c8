//! Volume-to-volume navigation of a single track.
//!
//! The navigator alternates between [`Navigator::target`], which asks the
//! geometry for the surfaces ahead of the track and picks the nearest, and
//! [`Navigator::status`], which checks whether the stepper reached that
//! surface and crosses portals. [`propagate`] runs the loop and records the
//! visited volumes and positions.

mod detector;
mod stepper;

pub use detector::{Detector, Surface, SurfaceShape, Volume};
pub use stepper::StraightLineStepper;

use std::cmp::Ordering;

use anyhow::{bail, Result};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::traits::{lit, Geometry, Scalar, StepOutcome, Stepper};

/// What happens when a track reaches a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceLink {
    /// Measurement surface; the track stays in its volume.
    Sensitive,
    /// Volume boundary leading to the given volume, or out of the world.
    Portal(Option<usize>),
}

/// A surface crossing ahead of (or behind) the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection<T: Scalar> {
    pub surface: usize,
    /// Signed path length along the track direction.
    pub path: T,
    /// Crossing point in the surface's local coordinates.
    pub local: Point2<T>,
    pub link: SurfaceLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationStatus {
    Initialized,
    Targeting,
    Stepping,
    /// The track left the world through a portal without a next volume.
    Exited,
    /// Stopped by the stepper or by the step limit.
    Aborted,
}

impl NavigationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exited | Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Distance below which a track counts as sitting on a surface.
    pub on_surface_tolerance: f64,
    pub max_steps: usize,
    /// Bin neighbourhood `[n0, n1]` searched in surface grids.
    pub search_window: [usize; 2],
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            on_surface_tolerance: 1e-4,
            max_steps: 1000,
            search_window: [1, 1],
        }
    }
}

/// Per-track navigation state, owned by one propagation.
#[derive(Debug, Clone)]
pub struct NavigationState<T: Scalar> {
    volume: usize,
    candidates: Vec<Intersection<T>>,
    heartbeat: bool,
    status: NavigationStatus,
    distance: T,
    target: Option<Point3<T>>,
    surface: Option<usize>,
}

impl<T: Scalar> NavigationState<T> {
    pub fn new(volume: usize) -> Self {
        Self {
            volume,
            candidates: Vec::new(),
            heartbeat: true,
            status: NavigationStatus::Initialized,
            distance: T::zero(),
            target: None,
            surface: None,
        }
    }

    pub fn volume(&self) -> usize {
        self.volume
    }

    /// Candidates ahead of the track, nearest first.
    pub fn candidates(&self) -> &[Intersection<T>] {
        &self.candidates
    }

    pub fn heartbeat(&self) -> bool {
        self.heartbeat
    }

    pub fn status(&self) -> NavigationStatus {
        self.status
    }

    /// Path length to the nearest candidate.
    pub fn distance(&self) -> T {
        self.distance
    }

    /// Surface the track currently sits on, if any.
    pub fn surface(&self) -> Option<usize> {
        self.surface
    }

    fn finish(&mut self, status: NavigationStatus) -> bool {
        self.status = status;
        self.heartbeat = false;
        self.candidates.clear();
        self.target = None;
        false
    }
}

pub struct Navigator<'a, G> {
    geometry: &'a G,
    config: NavigationConfig,
}

impl<'a, G> Navigator<'a, G> {
    pub fn new(geometry: &'a G, config: NavigationConfig) -> Self {
        Self { geometry, config }
    }

    pub fn geometry(&self) -> &'a G {
        self.geometry
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Fresh state positioned in `volume`.
    pub fn start<T>(&self, volume: usize) -> Result<NavigationState<T>>
    where
        T: Scalar,
        G: Geometry<T>,
    {
        let count = self.geometry.volume_count();
        if volume >= count {
            bail!("Start volume {volume} is out of range for a geometry with {count} volumes.");
        }
        Ok(NavigationState::new(volume))
    }

    /// Collect the candidates ahead of the stepper in the current volume and
    /// aim at the nearest one.
    pub fn target<T, S>(&self, state: &mut NavigationState<T>, stepper: &S) -> bool
    where
        T: Scalar,
        G: Geometry<T>,
        S: Stepper<T>,
    {
        if state.status.is_terminal() {
            return false;
        }
        let pos = stepper.position();
        let dir = stepper.direction();
        let tolerance = lit::<T>(self.config.on_surface_tolerance);

        state.candidates.clear();
        self.geometry.candidates(
            state.volume,
            &pos,
            &dir,
            self.config.search_window,
            &mut state.candidates,
        );
        trace!(
            volume = state.volume,
            found = state.candidates.len(),
            "evaluated navigation candidates"
        );
        // NaN paths fail the comparison and are dropped as well.
        state.candidates.retain(|c| c.path > tolerance);
        state
            .candidates
            .sort_by(|a, b| a.path.partial_cmp(&b.path).unwrap_or(Ordering::Equal));

        let Some(nearest) = state.candidates.first() else {
            debug!(volume = state.volume, "no surface ahead, leaving the world");
            return state.finish(NavigationStatus::Exited);
        };
        state.distance = nearest.path;
        state.target = Some(pos + dir * nearest.path);
        state.status = NavigationStatus::Targeting;
        state.heartbeat = true;
        true
    }

    /// Re-evaluate after the stepper moved: cross a portal or register a
    /// sensitive hit once the targeted surface is reached.
    pub fn status<T, S>(&self, state: &mut NavigationState<T>, stepper: &S) -> bool
    where
        T: Scalar,
        G: Geometry<T>,
        S: Stepper<T>,
    {
        if state.status.is_terminal() {
            return false;
        }
        let Some(target) = state.target else {
            return state.heartbeat;
        };
        let tolerance = lit::<T>(self.config.on_surface_tolerance);
        let remaining = (target - stepper.position()).dot(&stepper.direction());

        state.status = NavigationStatus::Stepping;
        if remaining > tolerance {
            state.distance = remaining;
            state.surface = None;
            return true;
        }

        // Several surfaces can coincide with the target; a portal wins.
        let reached = state.candidates.first().map(|nearest| {
            let reach = nearest.path + tolerance;
            *state
                .candidates
                .iter()
                .take_while(|c| c.path <= reach)
                .find(|c| matches!(c.link, SurfaceLink::Portal(_)))
                .unwrap_or(nearest)
        });
        state.target = None;
        state.distance = T::zero();

        let Some(hit) = reached else {
            return state.heartbeat;
        };
        state.surface = Some(hit.surface);
        match hit.link {
            SurfaceLink::Sensitive => {
                trace!(volume = state.volume, surface = hit.surface, "sensitive surface reached");
                true
            }
            SurfaceLink::Portal(Some(next)) if next < self.geometry.volume_count() => {
                debug!(from = state.volume, to = next, surface = hit.surface, "crossed portal");
                state.volume = next;
                true
            }
            SurfaceLink::Portal(Some(next)) => {
                debug!(
                    volume = state.volume,
                    next, "portal links to an unknown volume, aborting"
                );
                state.finish(NavigationStatus::Aborted)
            }
            SurfaceLink::Portal(None) => {
                debug!(volume = state.volume, surface = hit.surface, "track exited the world");
                state.finish(NavigationStatus::Exited)
            }
        }
    }

    /// Force-stop the propagation.
    pub fn abort<T: Scalar>(&self, state: &mut NavigationState<T>) {
        debug!(volume = state.volume, "navigation aborted");
        state.finish(NavigationStatus::Aborted);
    }
}

/// Visited volumes and positions, one entry per completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationRecord<T: Scalar> {
    pub volumes: Vec<usize>,
    pub positions: Vec<Point3<T>>,
    pub status: NavigationStatus,
}

impl<T: Scalar> PropagationRecord<T> {
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Run `target → step → status` until the heartbeat stops.
pub fn propagate<T, G, S>(
    navigator: &Navigator<'_, G>,
    stepper: &mut S,
    start_volume: usize,
) -> Result<PropagationRecord<T>>
where
    T: Scalar,
    G: Geometry<T>,
    S: Stepper<T>,
{
    let mut state = navigator.start(start_volume)?;
    let mut record = PropagationRecord {
        volumes: Vec::new(),
        positions: Vec::new(),
        status: NavigationStatus::Initialized,
    };

    let mut heartbeat = navigator.target(&mut state, stepper);
    while heartbeat {
        if record.len() >= navigator.config().max_steps {
            debug!(steps = record.len(), "step limit reached");
            navigator.abort(&mut state);
            break;
        }
        if let StepOutcome::Abort = stepper.step(state.distance()) {
            navigator.abort(&mut state);
            break;
        }
        heartbeat = navigator.status(&mut state, stepper);
        record.volumes.push(state.volume());
        record.positions.push(stepper.position());
        if heartbeat {
            heartbeat = navigator.target(&mut state, stepper);
        }
    }

    record.status = state.status();
    Ok(record)
}
