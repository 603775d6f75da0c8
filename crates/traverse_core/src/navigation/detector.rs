//! A barrel detector made of concentric cylindrical volumes.

use anyhow::{bail, Result};
use nalgebra::{Point2, Point3, Vector3};
use tracing::trace;

use super::{Intersection, SurfaceLink};
use crate::axis::{Circular, Closed, Grid2};
use crate::frames::{Cartesian2, CoordinateFrame, Cylindrical2, Polar2};
use crate::masks::{Cylinder2, Mask, Rectangle2, Ring2};
use crate::traits::{lit, Geometry, Scalar};
use crate::transform::Transform3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceShape<T> {
    /// Planar module in cartesian local coordinates.
    Rectangle(Rectangle2<T>),
    /// Planar annulus in polar local coordinates.
    Disc(Ring2<T>),
    /// Barrel about the transform's z axis.
    Cylinder(Cylinder2<T>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface<T: Scalar> {
    pub transform: Transform3<T>,
    pub shape: SurfaceShape<T>,
    pub link: SurfaceLink,
}

impl<T: Scalar> Surface<T> {
    fn intersect(
        &self,
        index: usize,
        pos: &Point3<T>,
        dir: &Vector3<T>,
        tolerance: T,
        out: &mut Vec<Intersection<T>>,
    ) {
        let trf = &self.transform;
        match &self.shape {
            SurfaceShape::Rectangle(mask) => {
                if let Some(path) = plane_path(trf, pos, dir) {
                    let local = Cartesian2.global_to_local(trf, &(*pos + *dir * path), dir);
                    if mask.is_inside(&local, tolerance) {
                        out.push(self.hit(index, path, local));
                    }
                }
            }
            SurfaceShape::Disc(mask) => {
                if let Some(path) = plane_path(trf, pos, dir) {
                    let local = Polar2.global_to_local(trf, &(*pos + *dir * path), dir);
                    if mask.is_inside(&local, tolerance) {
                        out.push(self.hit(index, path, local));
                    }
                }
            }
            SurfaceShape::Cylinder(mask) => {
                for path in cylinder_paths(trf, mask.radius, pos, dir).into_iter().flatten() {
                    let local = Cylindrical2.global_to_local(trf, &(*pos + *dir * path), dir);
                    if mask.is_inside(&local, tolerance) {
                        out.push(self.hit(index, path, local));
                    }
                }
            }
        }
    }

    fn hit(&self, surface: usize, path: T, local: Point2<T>) -> Intersection<T> {
        Intersection {
            surface,
            path,
            local,
            link: self.link,
        }
    }
}

/// Path length from `pos` along `dir` to the plane through the transform's
/// origin with normal along its local z axis.
fn plane_path<T: Scalar>(trf: &Transform3<T>, pos: &Point3<T>, dir: &Vector3<T>) -> Option<T> {
    let normal = trf.rotation().column(2).into_owned();
    let denom = normal.dot(dir);
    if denom == T::zero() {
        return None;
    }
    Some(normal.dot(&(trf.translation() - pos.coords)) / denom)
}

/// Both path lengths to the infinite cylinder of `radius` about the
/// transform's local z axis, smaller first.
fn cylinder_paths<T: Scalar>(
    trf: &Transform3<T>,
    radius: T,
    pos: &Point3<T>,
    dir: &Vector3<T>,
) -> [Option<T>; 2] {
    let p = trf.point_to_local(pos);
    let d = trf.vector_to_local(dir);
    let a = d.x * d.x + d.y * d.y;
    if a == T::zero() {
        return [None, None];
    }
    let b = lit::<T>(2.0) * (p.x * d.x + p.y * d.y);
    let c = p.x * p.x + p.y * p.y - radius * radius;
    let discriminant = b * b - lit::<T>(4.0) * a * c;
    if discriminant < T::zero() {
        return [None, None];
    }
    let root = discriminant.sqrt();
    let two_a = a + a;
    [Some((-b - root) / two_a), Some((-b + root) / two_a)]
}

/// Planar modules arranged around the beam line, binned in `(phi, z)`.
#[derive(Debug, Clone, PartialEq)]
struct Layer<T: Scalar> {
    radius: T,
    /// Radius reached by the module edges, `radius / cos(phi_width / 2)`.
    envelope: T,
    grid: Grid2<Circular<T>, Closed<T>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T: Scalar> {
    pub r: [T; 2],
    pub z: [T; 2],
    portals: Vec<usize>,
    modules: Vec<usize>,
    layer: Option<Layer<T>>,
}

impl<T: Scalar> Volume<T> {
    pub fn portals(&self) -> &[usize] {
        &self.portals
    }

    pub fn modules(&self) -> &[usize] {
        &self.modules
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detector<T: Scalar> {
    volumes: Vec<Volume<T>>,
    surfaces: Vec<Surface<T>>,
    mask_tolerance: T,
}

impl<T: Scalar> Detector<T> {
    pub fn new(mask_tolerance: T) -> Self {
        Self {
            volumes: Vec::new(),
            surfaces: Vec::new(),
            mask_tolerance,
        }
    }

    /// Concentric volumes between consecutive `radii`, each spanning
    /// `|z| <= half_z`, closed by cylinder and disc portals. Inner and outer
    /// cylinders link neighbouring volumes; discs and the outermost
    /// cylinder lead out of the world.
    pub fn barrel(radii: &[T], half_z: T, mask_tolerance: T) -> Result<Self> {
        if radii.len() < 2 {
            bail!("A barrel needs at least two radii.");
        }
        if radii[0] < T::zero() || radii.windows(2).any(|w| !(w[0] < w[1])) {
            bail!("Barrel radii must be non-negative and strictly increasing.");
        }
        if !(half_z > T::zero()) {
            bail!("Barrel half length must be positive.");
        }

        let mut detector = Self::new(mask_tolerance);
        let count = radii.len() - 1;
        for (index, bounds) in radii.windows(2).enumerate() {
            let (inner, outer) = (bounds[0], bounds[1]);
            let volume = detector.add_volume([inner, outer], [-half_z, half_z]);
            if inner > T::zero() {
                detector.add_surface(
                    volume,
                    Surface {
                        transform: Transform3::identity(),
                        shape: SurfaceShape::Cylinder(Cylinder2 {
                            radius: inner,
                            half_z,
                        }),
                        link: SurfaceLink::Portal(index.checked_sub(1)),
                    },
                )?;
            }
            detector.add_surface(
                volume,
                Surface {
                    transform: Transform3::identity(),
                    shape: SurfaceShape::Cylinder(Cylinder2 {
                        radius: outer,
                        half_z,
                    }),
                    link: SurfaceLink::Portal(Some(index + 1).filter(|next| *next < count)),
                },
            )?;
            for z in [-half_z, half_z] {
                detector.add_surface(
                    volume,
                    Surface {
                        transform: Transform3::from_translation(Vector3::new(
                            T::zero(),
                            T::zero(),
                            z,
                        )),
                        shape: SurfaceShape::Disc(Ring2 { inner, outer }),
                        link: SurfaceLink::Portal(None),
                    },
                )?;
            }
        }
        Ok(detector)
    }

    pub fn add_volume(&mut self, r: [T; 2], z: [T; 2]) -> usize {
        self.volumes.push(Volume {
            r,
            z,
            portals: Vec::new(),
            modules: Vec::new(),
            layer: None,
        });
        self.volumes.len() - 1
    }

    /// Attach a surface to `volume`; portals and sensitive surfaces are
    /// kept apart so that only the latter go through the layer grid.
    pub fn add_surface(&mut self, volume: usize, surface: Surface<T>) -> Result<usize> {
        let count = self.volumes.len();
        let Some(vol) = self.volumes.get_mut(volume) else {
            bail!("Volume {volume} does not exist (detector has {count} volumes).");
        };
        let index = self.surfaces.len();
        match surface.link {
            SurfaceLink::Sensitive => vol.modules.push(index),
            SurfaceLink::Portal(_) => vol.portals.push(index),
        }
        self.surfaces.push(surface);
        Ok(index)
    }

    /// Fill `volume` with a layer of `phi_bins * z_bins` planar modules
    /// tangent to the cylinder of `radius`, and index them in a
    /// `(phi, z)` grid sharing the module segmentation.
    pub fn add_layer(
        &mut self,
        volume: usize,
        radius: T,
        phi_bins: usize,
        z_bins: usize,
    ) -> Result<()> {
        let Some(vol) = self.volumes.get(volume) else {
            bail!("Volume {volume} does not exist.");
        };
        if vol.layer.is_some() {
            bail!("Volume {volume} already holds a layer.");
        }
        if !(radius > vol.r[0] && radius < vol.r[1]) {
            bail!("Layer radius must lie strictly inside the volume.");
        }
        let [z_min, z_max] = vol.z;
        let mut grid = Grid2::new(Circular::phi(phi_bins)?, Closed::new(z_min, z_max, z_bins)?);

        let phi_width = grid.axis0().bin_width();
        let z_width = grid.axis1().bin_width();
        let half_x = radius * (phi_width / lit(2.0)).tan();
        let half_y = z_width / lit(2.0);
        let half = lit::<T>(0.5);
        for iphi in 0..phi_bins {
            let phi = grid.axis0().min() + (lit::<T>(iphi as f64) + half) * phi_width;
            let (sin_phi, cos_phi) = phi.sin_cos();
            for iz in 0..z_bins {
                let z = z_min + (lit::<T>(iz as f64) + half) * z_width;
                let transform = Transform3::from_axes(
                    Vector3::new(radius * cos_phi, radius * sin_phi, z),
                    Vector3::new(cos_phi, sin_phi, T::zero()),
                    Vector3::new(-sin_phi, cos_phi, T::zero()),
                );
                let index = self.add_surface(
                    volume,
                    Surface {
                        transform,
                        shape: SurfaceShape::Rectangle(Rectangle2 { half_x, half_y }),
                        link: SurfaceLink::Sensitive,
                    },
                )?;
                grid.populate(phi, z, index);
            }
        }
        let envelope = radius / (phi_width / lit(2.0)).cos();
        self.volumes[volume].layer = Some(Layer {
            radius,
            envelope,
            grid,
        });
        Ok(())
    }

    pub fn volumes(&self) -> &[Volume<T>] {
        &self.volumes
    }

    pub fn surfaces(&self) -> &[Surface<T>] {
        &self.surfaces
    }

    /// Modules near the points where the line passes through the layer:
    /// its crossings of the reference and envelope cylinders, and its
    /// closest approach to the beam line when that lies within the envelope.
    fn nearby_modules(
        &self,
        layer: &Layer<T>,
        pos: &Point3<T>,
        dir: &Vector3<T>,
        window: [usize; 2],
    ) -> Vec<usize> {
        let mut found = Vec::new();
        let mut lookup = |point: Point3<T>| {
            let phi = point.y.atan2(point.x);
            found.extend(layer.grid.zone(phi, point.z, window));
        };

        let axis = Transform3::identity();
        for radius in [layer.radius, layer.envelope] {
            for path in cylinder_paths(&axis, radius, pos, dir).into_iter().flatten() {
                lookup(*pos + *dir * path);
            }
        }
        let transverse = dir.x * dir.x + dir.y * dir.y;
        if transverse > T::zero() {
            let path = -(pos.x * dir.x + pos.y * dir.y) / transverse;
            let closest = *pos + *dir * path;
            let r2 = closest.x * closest.x + closest.y * closest.y;
            if r2 <= layer.envelope * layer.envelope {
                lookup(closest);
            }
        }

        found.sort_unstable();
        found.dedup();
        found
    }
}

impl<T: Scalar> Geometry<T> for Detector<T> {
    fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    fn candidates(
        &self,
        volume: usize,
        pos: &Point3<T>,
        dir: &Vector3<T>,
        window: [usize; 2],
        out: &mut Vec<Intersection<T>>,
    ) {
        let Some(vol) = self.volumes.get(volume) else {
            return;
        };
        for &index in &vol.portals {
            self.surfaces[index].intersect(index, pos, dir, self.mask_tolerance, out);
        }
        let modules = match &vol.layer {
            Some(layer) => self.nearby_modules(layer, pos, dir, window),
            None => vol.modules.clone(),
        };
        trace!(volume, modules = modules.len(), "module lookup");
        for index in modules {
            self.surfaces[index].intersect(index, pos, dir, self.mask_tolerance, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cylinder_paths, plane_path, Detector, SurfaceShape};
    use crate::navigation::{
        propagate, Intersection, NavigationConfig, NavigationStatus, Navigator,
        StraightLineStepper, SurfaceLink,
    };
    use crate::traits::Geometry;
    use crate::tracks::{direction_from_angles, FreeVector};
    use crate::transform::Transform3;
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::PI;

    fn two_volumes() -> Detector<f64> {
        let mut detector = Detector::barrel(&[0.0, 10.0, 20.0], 50.0, 1e-6).expect("valid barrel");
        detector.add_layer(1, 15.0, 8, 4).expect("layer fits");
        detector
    }

    fn hits(
        detector: &Detector<f64>,
        volume: usize,
        pos: Point3<f64>,
        dir: Vector3<f64>,
    ) -> Vec<Intersection<f64>> {
        let mut out = Vec::new();
        detector.candidates(volume, &pos, &dir, [1, 1], &mut out);
        out
    }

    #[test]
    fn plane_and_cylinder_paths() {
        let plane = Transform3::<f64>::from_translation(Vector3::new(0.0, 0.0, 4.0));
        let path = plane_path(&plane, &Point3::origin(), &Vector3::new(0.6, 0.0, 0.8));
        assert!((path.expect("not parallel") - 5.0).abs() < 1e-12);
        assert_eq!(plane_path(&plane, &Point3::origin(), &Vector3::x()), None);

        let axis = Transform3::<f64>::identity();
        let paths = cylinder_paths(&axis, 2.0, &Point3::new(-5.0, 0.0, 1.0), &Vector3::x());
        assert!((paths[0].expect("front crossing") - 3.0).abs() < 1e-12);
        assert!((paths[1].expect("back crossing") - 7.0).abs() < 1e-12);
        assert_eq!(
            cylinder_paths(&axis, 2.0, &Point3::origin(), &Vector3::z()),
            [None, None]
        );
    }

    #[test]
    fn barrel_builds_linked_portals() {
        let detector = two_volumes();
        assert_eq!(detector.volume_count(), 2);
        assert_eq!(detector.volumes()[0].portals().len(), 3);
        assert_eq!(detector.volumes()[1].portals().len(), 4);
        assert_eq!(detector.volumes()[1].modules().len(), 32);
        let links: Vec<SurfaceLink> = detector.volumes()[1]
            .portals()
            .iter()
            .map(|&i| detector.surfaces()[i].link)
            .collect();
        assert_eq!(
            links,
            vec![
                SurfaceLink::Portal(Some(0)),
                SurfaceLink::Portal(None),
                SurfaceLink::Portal(None),
                SurfaceLink::Portal(None)
            ]
        );
    }

    #[test]
    fn radial_track_sees_outer_portal_in_innermost_volume() {
        let detector = two_volumes();
        let found = hits(&detector, 0, Point3::origin(), Vector3::new(1.0, 0.0, 0.0));
        let ahead: Vec<&Intersection<f64>> = found.iter().filter(|c| c.path > 0.0).collect();
        assert_eq!(ahead.len(), 1);
        assert!((ahead[0].path - 10.0).abs() < 1e-12);
        assert_eq!(ahead[0].link, SurfaceLink::Portal(Some(1)));
    }

    #[test]
    fn layer_lookup_finds_the_crossed_module() {
        let detector = two_volumes();
        let dir = Vector3::new(0.3_f64.cos(), 0.3_f64.sin(), 0.0);
        let start = Point3::new(10.0 * dir.x, 10.0 * dir.y, 5.0);
        let found = hits(&detector, 1, start, dir);
        let modules: Vec<&Intersection<f64>> = found
            .iter()
            .filter(|c| c.link == SurfaceLink::Sensitive && c.path > 0.0)
            .collect();
        assert_eq!(modules.len(), 1);
        let module = &detector.surfaces()[modules[0].surface];
        assert!(matches!(module.shape, SurfaceShape::Rectangle(_)));
        // Module centred at phi = pi / 8 and z = 12.5, tangent at r = 15.
        let normal_distance = 15.0 / (0.3 - std::f64::consts::PI / 8.0).cos();
        assert!((modules[0].path - (normal_distance - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn invalid_construction_is_rejected() {
        assert!(Detector::<f64>::barrel(&[1.0], 5.0, 0.0).is_err());
        assert!(Detector::<f64>::barrel(&[0.0, 3.0, 2.0], 5.0, 0.0).is_err());
        assert!(Detector::<f64>::barrel(&[0.0, 3.0], -1.0, 0.0).is_err());

        let mut detector = two_volumes();
        assert!(detector.add_layer(0, 15.0, 4, 4).is_err());
        assert!(detector.add_layer(1, 12.0, 4, 4).is_err());
        assert!(detector.add_layer(7, 12.0, 4, 4).is_err());
    }

    #[test]
    fn tangential_track_beyond_layer_radius_finds_module_edge() {
        let detector = two_volumes();
        let phi0 = PI / 8.0 + 0.3;
        let pos = Point3::new(15.5 * phi0.cos(), 15.5 * phi0.sin(), 5.0);
        let dir = Vector3::new(phi0.sin(), -phi0.cos(), 0.0);

        let mut every_module = Vec::new();
        for &index in detector.volumes()[1].modules() {
            detector.surfaces()[index].intersect(index, &pos, &dir, 1e-6, &mut every_module);
        }
        let expected: Vec<usize> = every_module
            .iter()
            .filter(|c| c.path > 0.0)
            .map(|c| c.surface)
            .collect();
        assert_eq!(expected.len(), 1);

        let found: Vec<usize> = hits(&detector, 1, pos, dir)
            .iter()
            .filter(|c| c.link == SurfaceLink::Sensitive && c.path > 0.0)
            .map(|c| c.surface)
            .collect();
        assert_eq!(found, expected);
    }

    /// Beam pipe volume plus two instrumented barrel volumes.
    fn three_volumes() -> Detector<f64> {
        let mut detector =
            Detector::barrel(&[0.0, 25.0, 50.0, 75.0], 200.0, 1e-6).expect("valid barrel");
        detector.add_layer(1, 37.5, 16, 8).expect("layer in volume 1");
        detector.add_layer(2, 62.5, 24, 8).expect("layer in volume 2");
        detector
    }

    fn from_origin(phi: f64, theta: f64) -> StraightLineStepper<f64> {
        let dir = direction_from_angles(phi, theta);
        StraightLineStepper::new(FreeVector::new(Point3::origin(), 0.0, dir, -1.0))
    }

    fn radius(p: &Point3<f64>) -> f64 {
        p.x.hypot(p.y)
    }

    #[test]
    fn straight_track_crosses_every_barrel_volume() {
        let detector = three_volumes();
        let navigator = Navigator::new(&detector, NavigationConfig::default());
        let mut stepper = from_origin(0.4, 1.2);

        let record = propagate(&navigator, &mut stepper, 0).expect("propagation runs");

        assert_eq!(record.status, NavigationStatus::Exited);
        assert_eq!(record.volumes, vec![1, 1, 2, 2, 2]);
        assert!((radius(&record.positions[0]) - 25.0).abs() < 1e-9);
        assert!(radius(&record.positions[1]) >= 37.5 - 1e-9);
        assert!((radius(&record.positions[2]) - 50.0).abs() < 1e-9);
        assert!((radius(&record.positions[4]) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn track_along_the_beam_leaves_through_the_end_disc() {
        let detector = three_volumes();
        let navigator = Navigator::new(&detector, NavigationConfig::default());
        let mut stepper = StraightLineStepper::new(FreeVector::new(
            Point3::new(1.0, 1.0, 0.0),
            0.0,
            Vector3::z(),
            1.0,
        ));

        let record = propagate(&navigator, &mut stepper, 0).expect("propagation runs");

        assert_eq!(record.status, NavigationStatus::Exited);
        assert_eq!(record.volumes, vec![0]);
        assert!((record.positions[0].z - 200.0).abs() < 1e-9);
    }

    #[test]
    fn exhausted_path_is_reported_as_abort() {
        let detector = three_volumes();
        let navigator = Navigator::new(&detector, NavigationConfig::default());
        let mut stepper = from_origin(-2.0, 1.7).with_path_limit(40.0);

        let record = propagate(&navigator, &mut stepper, 0).expect("propagation runs");

        assert_eq!(record.status, NavigationStatus::Aborted);
        assert_eq!(record.volumes.first(), Some(&1));
        assert!((stepper.path_length() - 40.0).abs() < 1e-9);
    }
}
