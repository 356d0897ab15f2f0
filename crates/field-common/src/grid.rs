//! Two-dimensional latitude/longitude grids.
//!
//! A [`Grid`] stores one longitude and one latitude value per cell, row-major
//! with latitude as the slow axis (`longitude[lat_index][lon_index]`). The
//! arrays may be curvilinear; consumers that need separable axes use
//! [`Grid::lat_axis`] and [`Grid::lon_axis`].

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{FieldError, FieldResult};

/// Largest lattice [`Grid::fallback`] will build (about 800 MB of coordinates).
pub const MAX_FALLBACK_CELLS: usize = 100_000_000;

/// Grid dimensions (rows = latitude, columns = longitude).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub n_lat: usize,
    pub n_lon: usize,
}

impl GridShape {
    /// Create a new shape.
    pub fn new(n_lat: usize, n_lon: usize) -> Self {
        Self { n_lat, n_lon }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.n_lat * self.n_lon
    }

    /// Whether the shape has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape as an `(n_lat, n_lon)` tuple.
    pub fn as_tuple(&self) -> (usize, usize) {
        (self.n_lat, self.n_lon)
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.n_lat, self.n_lon)
    }
}

/// An immutable latitude/longitude grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    longitude: Vec<f32>,
    latitude: Vec<f32>,
    shape: GridShape,
}

impl Grid {
    /// Build a grid from row-major coordinate arrays.
    ///
    /// Fails if either array does not hold `n_lat * n_lon` values or if any
    /// coordinate is non-finite. A grid is never returned half-built.
    pub fn new(
        longitude: Vec<f32>,
        latitude: Vec<f32>,
        n_lat: usize,
        n_lon: usize,
    ) -> FieldResult<Self> {
        if n_lat == 0 || n_lon == 0 {
            return Err(FieldError::InvalidDefinition(format!(
                "grid must have at least one cell, got {n_lat}x{n_lon}"
            )));
        }

        let expected = n_lat * n_lon;
        for len in [longitude.len(), latitude.len()] {
            if len != expected {
                return Err(FieldError::BadLength { len, n_lat, n_lon });
            }
        }

        if let Some(idx) = longitude
            .iter()
            .chain(latitude.iter())
            .position(|v| !v.is_finite())
        {
            return Err(FieldError::NonFiniteCoordinate(idx % expected));
        }

        Ok(Self {
            longitude,
            latitude,
            shape: GridShape::new(n_lat, n_lon),
        })
    }

    /// Build a rectilinear grid from 1D axes (meshgrid).
    pub fn from_axes(lon_axis: &[f32], lat_axis: &[f32]) -> FieldResult<Self> {
        let n_lat = lat_axis.len();
        let n_lon = lon_axis.len();

        let mut longitude = Vec::with_capacity(n_lat * n_lon);
        let mut latitude = Vec::with_capacity(n_lat * n_lon);
        for &lat in lat_axis {
            longitude.extend_from_slice(lon_axis);
            latitude.extend(std::iter::repeat(lat).take(n_lon));
        }

        Self::new(longitude, latitude, n_lat, n_lon)
    }

    /// Build a regular lattice over `bounds` with `resolution` degree spacing.
    ///
    /// Each axis gets `round(span / resolution) + 1` evenly spaced points
    /// from min to max inclusive. Pure function of its inputs. Lattices over
    /// [`MAX_FALLBACK_CELLS`] cells are rejected before allocating.
    pub fn fallback(bounds: BoundingBox, resolution: f64) -> FieldResult<Self> {
        if !bounds.is_valid() {
            return Err(FieldError::InvalidDefinition(format!(
                "invalid bounds {bounds}"
            )));
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(FieldError::InvalidDefinition(format!(
                "resolution must be positive, got {resolution}"
            )));
        }

        let n_lon = (bounds.width() / resolution).round() + 1.0;
        let n_lat = (bounds.height() / resolution).round() + 1.0;
        if n_lon * n_lat > MAX_FALLBACK_CELLS as f64 {
            return Err(FieldError::InvalidDefinition(format!(
                "resolution {resolution} over {bounds} needs {n_lat}x{n_lon} points, limit is {MAX_FALLBACK_CELLS}"
            )));
        }
        let (n_lon, n_lat) = (n_lon as usize, n_lat as usize);

        let lon_axis = linspace(bounds.min_lon, bounds.max_lon, n_lon);
        let lat_axis = linspace(bounds.min_lat, bounds.max_lat, n_lat);

        Self::from_axes(&lon_axis, &lat_axis)
    }

    /// Grid dimensions.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn n_lat(&self) -> usize {
        self.shape.n_lat
    }

    pub fn n_lon(&self) -> usize {
        self.shape.n_lon
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Always false; grids have at least one cell.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Row-major longitude array.
    pub fn longitude(&self) -> &[f32] {
        &self.longitude
    }

    /// Row-major latitude array.
    pub fn latitude(&self) -> &[f32] {
        &self.latitude
    }

    /// Coordinates of one cell as `(lon, lat)`.
    pub fn coords(&self, row: usize, col: usize) -> Option<(f32, f32)> {
        if row >= self.shape.n_lat || col >= self.shape.n_lon {
            return None;
        }
        let idx = row * self.shape.n_lon + col;
        Some((self.longitude[idx], self.latitude[idx]))
    }

    /// Longitude axis taken from the first row.
    pub fn lon_axis(&self) -> Vec<f32> {
        self.longitude[..self.shape.n_lon].to_vec()
    }

    /// Latitude axis taken from the first column.
    pub fn lat_axis(&self) -> Vec<f32> {
        self.latitude
            .iter()
            .step_by(self.shape.n_lon)
            .copied()
            .collect()
    }

    /// Whether longitude varies only along columns and latitude only along rows.
    pub fn is_rectilinear(&self, tolerance: f32) -> bool {
        let n_lon = self.shape.n_lon;
        let lon_axis = &self.longitude[..n_lon];

        self.longitude
            .chunks_exact(n_lon)
            .all(|row| row.iter().zip(lon_axis).all(|(a, b)| (a - b).abs() <= tolerance))
            && self
                .latitude
                .chunks_exact(n_lon)
                .all(|row| row.iter().all(|v| (v - row[0]).abs() <= tolerance))
    }

    /// Extent of all coordinates.
    pub fn bbox(&self) -> BoundingBox {
        let (min_lon, max_lon) = min_max(&self.longitude);
        let (min_lat, max_lat) = min_max(&self.latitude);
        BoundingBox::new(min_lon as f64, min_lat as f64, max_lon as f64, max_lat as f64)
    }
}

/// `n` evenly spaced f32 values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start as f32],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| (start + step * i as f64) as f32).collect()
        }
    }
}

fn min_max(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
