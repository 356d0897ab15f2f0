//! Generators for synthetic grids and fields.
//!
//! The patterns are simple closed forms so tests can assert exact values
//! after a read/write or regrid.

use field_common::{BoundingBox, Grid, GridShape, ScalarField, VectorField};

/// A rectilinear grid with `n_lon` x `n_lat` evenly spaced nodes over `bbox`.
pub fn regular_grid(bbox: BoundingBox, n_lat: usize, n_lon: usize) -> Grid {
    let lon: Vec<f32> = axis(bbox.min_lon, bbox.max_lon, n_lon);
    let lat: Vec<f32> = axis(bbox.min_lat, bbox.max_lat, n_lat);
    Grid::from_axes(&lon, &lat).expect("regular test grid must be valid")
}

/// A field whose value at (row, col) is `col * 1000 + row`.
///
/// ```
/// use field_common::GridShape;
/// use test_utils::index_field;
///
/// let field = index_field(GridShape::new(5, 10));
/// assert_eq!(field.get(0, 1), Some(1000.0));
/// assert_eq!(field.get(1, 0), Some(1.0));
/// ```
pub fn index_field(shape: GridShape) -> ScalarField {
    let mut data = Vec::with_capacity(shape.len());
    for row in 0..shape.n_lat {
        for col in 0..shape.n_lon {
            data.push((col * 1000 + row) as f32);
        }
    }
    ScalarField::new(data, shape.n_lat, shape.n_lon).expect("shape is consistent")
}

/// A field linear in the grid coordinates: `a * lon + b * lat + c`.
///
/// Bilinear interpolation reproduces such a field exactly, which makes it
/// a natural check for regridding tests.
pub fn linear_field(grid: &Grid, a: f32, b: f32, c: f32) -> ScalarField {
    let data = grid
        .longitude()
        .iter()
        .zip(grid.latitude())
        .map(|(&lon, &lat)| a * lon + b * lat + c)
        .collect();
    ScalarField::new(data, grid.n_lat(), grid.n_lon()).expect("shape is consistent")
}

/// A uniform anomaly field with constant components.
pub fn uniform_anomaly(shape: GridShape, u: f32, v: f32) -> VectorField {
    VectorField::new(ScalarField::filled(shape, u), ScalarField::filled(shape, v))
        .expect("components share a shape")
}

/// A single Gaussian eddy: speed peaks at the centre and decays outward.
///
/// Components are tangential so the pattern looks like a real ring.
pub fn eddy_anomaly(shape: GridShape, peak_speed: f32) -> VectorField {
    let cy = (shape.n_lat as f32 - 1.0) / 2.0;
    let cx = (shape.n_lon as f32 - 1.0) / 2.0;
    let radius = (shape.n_lat.min(shape.n_lon) as f32 / 4.0).max(1.0);

    let mut u = Vec::with_capacity(shape.len());
    let mut v = Vec::with_capacity(shape.len());
    for row in 0..shape.n_lat {
        for col in 0..shape.n_lon {
            let dy = row as f32 - cy;
            let dx = col as f32 - cx;
            let r2 = (dx * dx + dy * dy) / (radius * radius);
            let speed = peak_speed * (-r2).exp();
            let norm = (dx * dx + dy * dy).sqrt().max(1e-6);
            u.push(-speed * dy / norm);
            v.push(speed * dx / norm);
        }
    }

    VectorField::new(
        ScalarField::new(u, shape.n_lat, shape.n_lon).expect("shape is consistent"),
        ScalarField::new(v, shape.n_lat, shape.n_lon).expect("shape is consistent"),
    )
    .expect("components share a shape")
}

/// Copy of `field` with the given flat indices set to `NaN`.
pub fn with_nan_cells(field: &ScalarField, indices: &[usize]) -> ScalarField {
    let mut data = field.data().to_vec();
    for &idx in indices {
        data[idx] = f32::NAN;
    }
    ScalarField::new(data, field.shape().n_lat, field.shape().n_lon)
        .expect("shape is consistent")
}

fn axis(start: f64, end: f64, n: usize) -> Vec<f32> {
    if n == 1 {
        return vec![start as f32];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| (start + step * i as f64) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid_extent() {
        let grid = regular_grid(BoundingBox::new(0.0, 10.0, 4.0, 12.0), 3, 5);
        assert_eq!(grid.shape(), GridShape::new(3, 5));
        assert_eq!(grid.coords(2, 4), Some((4.0, 12.0)));
    }

    #[test]
    fn test_linear_field_values() {
        let grid = regular_grid(BoundingBox::new(0.0, 0.0, 2.0, 2.0), 3, 3);
        let field = linear_field(&grid, 1.0, 10.0, 0.5);
        assert_eq!(field.get(1, 2), Some(2.0 + 10.0 + 0.5));
    }

    #[test]
    fn test_eddy_is_finite() {
        let eddy = eddy_anomaly(GridShape::new(9, 9), 0.5);
        assert_eq!(eddy.u().nan_count(), 0);
        assert!(eddy.u().stats().max <= 0.5);
    }
}
