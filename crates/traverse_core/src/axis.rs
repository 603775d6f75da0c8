//! Regular axes mapping a continuous coordinate onto equal-width bins.
//!
//! Two boundary behaviours are provided:
//! - [`Closed`]: underflow lands in bin `0`, overflow in bin `bins - 1`.
//! - [`Circular`]: values wrap modulo the axis period (e.g. phi).
//!
//! [`Grid2`] combines two axes into the surface index a volume uses to find
//! the modules close to a point.

use serde::{Deserialize, Serialize};

use crate::error::AxisError;
use crate::traits::{lit, Scalar};

/// Inclusive pair of bin indices. For a circular axis `[lo, hi]` with
/// `lo > hi` wraps through the last bin back to bin `0`.
pub type BinRange = [usize; 2];

/// Bin queries shared by every axis flavour.
pub trait Axis {
    type Value: Scalar;

    fn bins(&self) -> usize;

    /// Bin index of `v`, always in `[0, bins - 1]`.
    fn bin(&self, v: Self::Value) -> usize;

    /// Neighbourhood of `v` reaching `nhood` bins to either side.
    fn range(&self, v: Self::Value, nhood: usize) -> BinRange;

    /// Every bin of [`Axis::range`], in walking order and without repeats.
    fn zone(&self, v: Self::Value, nhood: usize) -> Vec<usize>;

    /// Lower and upper edge of `bin`.
    fn borders(&self, bin: usize) -> (Self::Value, Self::Value);
}

#[derive(Deserialize)]
struct AxisBounds<T> {
    min: T,
    max: T,
    bins: usize,
}

fn validate<T: Scalar>(min: T, max: T, bins: usize) -> Result<(), AxisError> {
    if bins == 0 {
        return Err(AxisError::NoBins);
    }
    if !min.is_finite() || !max.is_finite() || max <= min {
        return Err(AxisError::InvalidBounds {
            min: min.to_f64().unwrap_or(f64::NAN),
            max: max.to_f64().unwrap_or(f64::NAN),
        });
    }
    Ok(())
}

/// `floor((v - min) / (max - min) * bins)` without clamping. `None` when the
/// value has no integer representation (NaN, infinities, astronomically far
/// outside the axis).
fn unclamped_bin<T: Scalar>(min: T, max: T, bins: usize, v: T) -> Option<i64> {
    let scaled = ((v - min) / (max - min) * lit::<T>(bins as f64)).floor();
    scaled.to_i64()
}

fn borders<T: Scalar>(min: T, max: T, bins: usize, bin: usize) -> (T, T) {
    let width = (max - min) / lit::<T>(bins as f64);
    let lower = min + width * lit::<T>(bin as f64);
    (lower, lower + width)
}

/// A regular axis that absorbs under- and overflow into its edge bins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisBounds<T>")]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Scalar + Deserialize<'de>"))]
pub struct Closed<T> {
    min: T,
    max: T,
    bins: usize,
}

impl<T: Scalar> Closed<T> {
    pub fn new(min: T, max: T, bins: usize) -> Result<Self, AxisError> {
        validate(min, max, bins)?;
        Ok(Self { min, max, bins })
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn bin_width(&self) -> T {
        (self.max - self.min) / lit::<T>(self.bins as f64)
    }

    fn clamp(&self, ibin: i64) -> usize {
        let last = self.bins as i64 - 1;
        ibin.clamp(0, last) as usize
    }
}

impl<T: Scalar> TryFrom<AxisBounds<T>> for Closed<T> {
    type Error = AxisError;

    fn try_from(raw: AxisBounds<T>) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max, raw.bins)
    }
}

impl<T: Scalar> Axis for Closed<T> {
    type Value = T;

    fn bins(&self) -> usize {
        self.bins
    }

    fn bin(&self, v: T) -> usize {
        match unclamped_bin(self.min, self.max, self.bins, v) {
            Some(ibin) => self.clamp(ibin),
            None if v > self.max => self.bins - 1,
            None => 0,
        }
    }

    fn range(&self, v: T, nhood: usize) -> BinRange {
        match unclamped_bin(self.min, self.max, self.bins, v) {
            Some(ibin) => {
                let nhood = i64::try_from(nhood).unwrap_or(i64::MAX);
                [
                    self.clamp(ibin.saturating_sub(nhood)),
                    self.clamp(ibin.saturating_add(nhood)),
                ]
            }
            None => {
                let edge = self.bin(v);
                [edge, edge]
            }
        }
    }

    fn zone(&self, v: T, nhood: usize) -> Vec<usize> {
        let [lo, hi] = self.range(v, nhood);
        (lo..=hi).collect()
    }

    fn borders(&self, bin: usize) -> (T, T) {
        borders(self.min, self.max, self.bins, bin)
    }
}

/// A regular periodic axis: bin `bins - 1` neighbours bin `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisBounds<T>")]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Scalar + Deserialize<'de>"))]
pub struct Circular<T> {
    min: T,
    max: T,
    bins: usize,
}

impl<T: Scalar> Circular<T> {
    pub fn new(min: T, max: T, bins: usize) -> Result<Self, AxisError> {
        validate(min, max, bins)?;
        Ok(Self { min, max, bins })
    }

    /// Full-turn axis over `[-pi, pi)`.
    pub fn phi(bins: usize) -> Result<Self, AxisError> {
        Self::new(-T::pi(), T::pi(), bins)
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn bin_width(&self) -> T {
        (self.max - self.min) / lit::<T>(self.bins as f64)
    }
}

impl<T: Scalar> TryFrom<AxisBounds<T>> for Circular<T> {
    type Error = AxisError;

    fn try_from(raw: AxisBounds<T>) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max, raw.bins)
    }
}

impl<T: Scalar> Axis for Circular<T> {
    type Value = T;

    fn bins(&self) -> usize {
        self.bins
    }

    fn bin(&self, v: T) -> usize {
        // No period information survives for non-representable values.
        unclamped_bin(self.min, self.max, self.bins, v)
            .map(|ibin| ibin.rem_euclid(self.bins as i64) as usize)
            .unwrap_or(0)
    }

    fn range(&self, v: T, nhood: usize) -> BinRange {
        let bins = self.bins;
        if nhood.saturating_mul(2).saturating_add(1) >= bins {
            return [0, bins - 1];
        }
        let center = self.bin(v);
        [(center + bins - nhood) % bins, (center + nhood) % bins]
    }

    fn zone(&self, v: T, nhood: usize) -> Vec<usize> {
        let bins = self.bins;
        let [lo, hi] = self.range(v, nhood);
        let len = if hi >= lo { hi - lo + 1 } else { hi + bins - lo + 1 };
        (0..len).map(|k| (lo + k) % bins).collect()
    }

    fn borders(&self, bin: usize) -> (T, T) {
        borders(self.min, self.max, self.bins, bin)
    }
}

/// Two-dimensional bin table of entry indices (typically surfaces).
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2<A0, A1> {
    axis0: A0,
    axis1: A1,
    entries: Vec<Vec<usize>>,
}

impl<A0, A1> Grid2<A0, A1> {
    pub fn axis0(&self) -> &A0 {
        &self.axis0
    }

    pub fn axis1(&self) -> &A1 {
        &self.axis1
    }

    /// Total number of stored entries, counting duplicates across bins.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }
}

impl<T, A0, A1> Grid2<A0, A1>
where
    T: Scalar,
    A0: Axis<Value = T>,
    A1: Axis<Value = T>,
{
    pub fn new(axis0: A0, axis1: A1) -> Self {
        let entries = vec![Vec::new(); axis0.bins() * axis1.bins()];
        Self {
            axis0,
            axis1,
            entries,
        }
    }

    fn slot(&self, i0: usize, i1: usize) -> usize {
        i1 * self.axis0.bins() + i0
    }

    /// Entries of bin `(i0, i1)`; empty for indices outside the grid.
    pub fn bin(&self, i0: usize, i1: usize) -> &[usize] {
        if i0 >= self.axis0.bins() || i1 >= self.axis1.bins() {
            return &[];
        }
        &self.entries[self.slot(i0, i1)]
    }

    /// Register `entry` in the bin containing `(p0, p1)`.
    pub fn populate(&mut self, p0: T, p1: T, entry: usize) {
        let slot = self.slot(self.axis0.bin(p0), self.axis1.bin(p1));
        let bin = &mut self.entries[slot];
        if !bin.contains(&entry) {
            bin.push(entry);
        }
    }

    /// Sorted, de-duplicated entries of every bin within `nhood` of `(p0, p1)`.
    pub fn zone(&self, p0: T, p1: T, nhood: [usize; 2]) -> Vec<usize> {
        let zone0 = self.axis0.zone(p0, nhood[0]);
        let zone1 = self.axis1.zone(p1, nhood[1]);
        let mut found = Vec::new();
        for &i1 in &zone1 {
            for &i0 in &zone0 {
                found.extend_from_slice(&self.entries[self.slot(i0, i1)]);
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::{Axis, Circular, Closed, Grid2};
    use crate::error::AxisError;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn closed10() -> Closed<f64> {
        Closed::new(0.0, 10.0, 10).expect("valid axis")
    }

    #[test]
    fn closed_axis_clamps_out_of_range_values() {
        let axis = closed10();
        assert_eq!(axis.bin(-5.0), 0);
        assert_eq!(axis.bin(15.0), 9);
        assert_eq!(axis.bin(3.5), 3);
        assert_eq!(axis.bin(10.0), 9);
        assert_eq!(axis.bin(f64::NAN), 0);
        assert_eq!(axis.bin(f64::INFINITY), 9);
        assert_eq!(axis.bin(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn closed_range_clamps_each_end_independently() {
        let axis = closed10();
        assert_eq!(axis.range(5.5, 2), [3, 7]);
        assert_eq!(axis.range(0.5, 2), [0, 2]);
        assert_eq!(axis.range(9.5, 3), [6, 9]);
        assert_eq!(axis.range(-25.0, 1), [0, 0]);
        assert_eq!(axis.range(-2.5, 4), [0, 1]);
        assert_eq!(axis.range(50.0, usize::MAX), [0, 9]);
    }

    #[test]
    fn closed_zone_is_contiguous_run() {
        let axis = closed10();
        assert_eq!(axis.zone(5.5, 1), vec![4, 5, 6]);
        assert_eq!(axis.zone(0.1, 2), vec![0, 1, 2]);
        assert_eq!(axis.zone(4.2, 0), vec![4]);
        assert_eq!(axis.zone(4.2, 20), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn circular_axis_is_periodic() {
        let axis = Circular::new(0.0, 2.0 * PI, 8).expect("valid axis");
        assert_eq!(axis.bin(2.0 * PI + 0.1), axis.bin(0.1));
        assert_eq!(axis.bin(-0.1), 7);
        assert_eq!(axis.bin(-2.0 * PI - 0.1), 7);
        assert_eq!(axis.bin(4.0 * PI + 0.1), 0);
        assert_eq!(axis.bin(2.0 * PI + 2.0 * PI / 8.0 * 3.5), 3);
    }

    #[test]
    fn circular_zone_wraps_through_zero() {
        let axis = Circular::new(0.0, 8.0, 8).expect("valid axis");
        assert_eq!(axis.range(7.5, 1), [6, 0]);
        assert_eq!(axis.zone(7.5, 1), vec![6, 7, 0]);
        assert_eq!(axis.zone(0.5, 2), vec![6, 7, 0, 1, 2]);
        assert_eq!(axis.zone(3.5, 1), vec![2, 3, 4]);
        assert_eq!(axis.zone(3.5, 0), vec![3]);
    }

    #[test]
    fn circular_zone_caps_at_full_axis() {
        let axis = Circular::new(0.0, 8.0, 8).expect("valid axis");
        assert_eq!(axis.range(2.5, 4), [0, 7]);
        assert_eq!(axis.zone(2.5, 4), (0..8).collect::<Vec<_>>());
        assert_eq!(axis.zone(2.5, usize::MAX), (0..8).collect::<Vec<_>>());

        let single = Circular::new(0.0, 1.0, 1).expect("valid axis");
        assert_eq!(single.zone(0.3, 3), vec![0]);
    }

    #[test]
    fn borders_tile_the_axis() {
        let axis = closed10();
        assert_eq!(axis.borders(0), (0.0, 1.0));
        let (lo, hi) = axis.borders(9);
        assert!((lo - 9.0).abs() < 1e-12 && (hi - 10.0).abs() < 1e-12);
        let phi = Circular::<f64>::phi(4).expect("valid axis");
        let (lo, hi) = phi.borders(2);
        assert!(lo.abs() < 1e-12 && (hi - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn construction_rejects_degenerate_axes() {
        assert_eq!(Closed::new(0.0, 1.0, 0), Err(AxisError::NoBins));
        assert!(matches!(
            Closed::new(1.0, 1.0, 4),
            Err(AxisError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Circular::new(0.0, f64::INFINITY, 4),
            Err(AxisError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn single_precision_axis_matches_double() {
        let axis = Closed::new(0.0f32, 10.0f32, 10).expect("valid axis");
        assert_eq!(axis.bin(3.5f32), 3);
        assert_eq!(axis.range(3.5f32, 1), [2, 4]);
    }

    #[test]
    fn grid_zone_collects_neighbouring_entries() {
        let phi = Circular::new(0.0, 4.0, 4).expect("valid axis");
        let z = Closed::new(0.0, 3.0, 3).expect("valid axis");
        let mut grid = Grid2::new(phi, z);
        grid.populate(0.5, 0.5, 10);
        grid.populate(3.5, 0.5, 11);
        grid.populate(1.5, 2.5, 12);
        grid.populate(0.5, 0.5, 10);

        assert_eq!(grid.entry_count(), 3);
        assert_eq!(grid.bin(0, 0), &[10]);
        assert!(grid.bin(9, 0).is_empty());
        assert_eq!(grid.zone(0.5, 0.5, [1, 0]), vec![10, 11]);
        assert_eq!(grid.zone(0.5, 0.5, [1, 2]), vec![10, 11, 12]);
        assert_eq!(grid.zone(2.5, 0.5, [0, 0]), Vec::<usize>::new());
    }

    proptest! {
        #[test]
        fn closed_bin_is_monotone_inside_range(a in 0.0f64..10.0, b in 0.0f64..10.0) {
            let axis = closed10();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(axis.bin(lo) <= axis.bin(hi));
            prop_assert!(axis.bin(hi) < 10);
        }

        #[test]
        fn closed_bin_clamps_outside_range(v in 10.0f64..1e12) {
            let axis = closed10();
            prop_assert_eq!(axis.bin(v + 1e-9), 9);
            prop_assert_eq!(axis.bin(-v), 0);
        }

        #[test]
        fn closed_zone_length_matches_range(v in -20.0f64..30.0, n in 0usize..15) {
            let axis = closed10();
            let [lo, hi] = axis.range(v, n);
            let zone = axis.zone(v, n);
            prop_assert!(lo <= hi && hi < 10);
            prop_assert_eq!(zone.len(), (hi - lo + 1).min(10));
            prop_assert!(zone.windows(2).all(|w| w[1] == w[0] + 1));
        }

        #[test]
        fn circular_bin_wraps_over_many_periods(v in -1e6f64..1e6, bins in 1usize..64) {
            let axis = Circular::new(-PI, PI, bins).expect("valid axis");
            prop_assert!(axis.bin(v) < bins);
        }

        #[test]
        fn circular_zone_has_no_repeats(v in -50.0f64..50.0, bins in 1usize..20, n in 0usize..25) {
            let axis = Circular::new(0.0, 10.0, bins).expect("valid axis");
            let mut zone = axis.zone(v, n);
            prop_assert_eq!(zone.len(), (2 * n + 1).min(bins));
            prop_assert!(zone.contains(&axis.bin(v)));
            zone.sort_unstable();
            zone.dedup();
            prop_assert_eq!(zone.len(), (2 * n + 1).min(bins));
        }
    }
}
