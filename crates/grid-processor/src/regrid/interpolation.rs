//! Bilinear interpolation on separable rectilinear axes.
//!
//! Axis order is part of the type signature rather than a convention:
//! the source axes are held as [`SeparableAxes`] `(lat, lon)`, matching the
//! row-major layout of the values, while query points are [`GeoPoint`]s with
//! named `lon` and `lat` fields. Nothing here accepts a bare `(f64, f64)`.

use field_common::{FieldError, Grid};

use crate::error::{GridProcessorError, Result};

/// A query location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Where a coordinate falls on an axis.
///
/// The interpolated value is `(1 - t) * v[lo] + t * v[hi]`, with indices
/// into the axis as originally ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    lo: usize,
    hi: usize,
    t: f64,
}

/// A strictly monotonic 1D coordinate axis.
#[derive(Debug, Clone)]
pub struct Axis {
    /// Values sorted ascending.
    ascending: Vec<f64>,
    /// Whether the original order was descending.
    flipped: bool,
}

impl Axis {
    /// Build an axis. Needs at least two strictly monotonic values.
    pub fn new(name: &'static str, values: &[f32]) -> Result<Self> {
        if values.len() < 2 {
            return Err(FieldError::DegenerateAxis {
                axis: name,
                len: values.len(),
            }
            .into());
        }

        let mut ascending: Vec<f64> = values.iter().map(|&v| v as f64).collect();
        let flipped = ascending[0] > ascending[ascending.len() - 1];
        if flipped {
            ascending.reverse();
        }

        if !ascending.windows(2).all(|w| w[0] < w[1]) {
            return Err(GridProcessorError::interpolation(format!(
                "{name} axis is not strictly monotonic"
            )));
        }

        Ok(Self { ascending, flipped })
    }

    pub fn len(&self) -> usize {
        self.ascending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ascending.is_empty()
    }

    /// Smallest and largest coordinate.
    pub fn range(&self) -> (f64, f64) {
        (self.ascending[0], self.ascending[self.ascending.len() - 1])
    }

    fn locate(&self, x: f64) -> Option<Bracket> {
        let (min, max) = self.range();
        // NaN fails both comparisons.
        if !(x >= min && x <= max) {
            return None;
        }

        let n = self.ascending.len();
        let k = self
            .ascending
            .partition_point(|&v| v <= x)
            .saturating_sub(1)
            .min(n - 2);
        let t = (x - self.ascending[k]) / (self.ascending[k + 1] - self.ascending[k]);

        Some(if self.flipped {
            Bracket {
                lo: n - 1 - k,
                hi: n - 2 - k,
                t,
            }
        } else {
            Bracket { lo: k, hi: k + 1, t }
        })
    }
}

/// Source axes in `(lat, lon)` order: latitude indexes rows, longitude columns.
#[derive(Debug, Clone)]
pub struct SeparableAxes {
    lat: Axis,
    lon: Axis,
}

impl SeparableAxes {
    /// Build from explicit 1D axes. Argument order is (lat, lon).
    pub fn new(lat: &[f32], lon: &[f32]) -> Result<Self> {
        Ok(Self {
            lat: Axis::new("latitude", lat)?,
            lon: Axis::new("longitude", lon)?,
        })
    }

    /// Take the axes of a grid: latitude from the first column, longitude from the first row.
    pub fn from_grid(grid: &Grid) -> Result<Self> {
        Self::new(&grid.lat_axis(), &grid.lon_axis())
    }

    pub fn lat(&self) -> &Axis {
        &self.lat
    }

    pub fn lon(&self) -> &Axis {
        &self.lon
    }

    /// Number of values a field on these axes holds.
    pub fn cell_count(&self) -> usize {
        self.lat.len() * self.lon.len()
    }
}

/// Bilinear interpolator over values laid out `[lat][lon]`.
///
/// Queries outside the axes' extent resolve to `fill_value`.
pub struct RegularGridInterpolator<'a> {
    axes: SeparableAxes,
    values: &'a [f32],
    fill_value: f32,
}

impl<'a> RegularGridInterpolator<'a> {
    pub fn new(axes: SeparableAxes, values: &'a [f32], fill_value: f32) -> Result<Self> {
        if values.len() != axes.cell_count() {
            return Err(FieldError::BadLength {
                len: values.len(),
                n_lat: axes.lat.len(),
                n_lon: axes.lon.len(),
            }
            .into());
        }

        Ok(Self {
            axes,
            values,
            fill_value,
        })
    }

    /// Interpolate at one point, or the fill value outside the axes' extent.
    pub fn sample(&self, point: GeoPoint) -> f32 {
        self.try_sample(point).unwrap_or(self.fill_value)
    }

    /// Interpolate at one point; `None` outside the axes' extent.
    ///
    /// Corners with zero weight are skipped, so a query on a node returns
    /// that node's value even next to missing cells. A `NaN` corner with
    /// non-zero weight makes the result `NaN`.
    pub fn try_sample(&self, point: GeoPoint) -> Option<f32> {
        let row = self.axes.lat.locate(point.lat)?;
        let col = self.axes.lon.locate(point.lon)?;

        let n_lon = self.axes.lon.len();
        let corners = [
            (row.lo, col.lo, (1.0 - row.t) * (1.0 - col.t)),
            (row.lo, col.hi, (1.0 - row.t) * col.t),
            (row.hi, col.lo, row.t * (1.0 - col.t)),
            (row.hi, col.hi, row.t * col.t),
        ];

        let mut acc = 0.0f64;
        for (r, c, weight) in corners {
            if weight == 0.0 {
                continue;
            }
            let value = self.values[r * n_lon + c];
            if value.is_nan() {
                return Some(f32::NAN);
            }
            acc += weight * value as f64;
        }

        Some(acc as f32)
    }
}
