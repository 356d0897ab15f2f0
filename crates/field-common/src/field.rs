//! Scalar and vector fields on a grid.
//!
//! Fields only carry their shape, not a reference to the grid they live on;
//! pipeline stages pass the grid alongside. `NaN` marks "no data".

use chrono::NaiveDate;

use crate::error::{FieldError, FieldResult};
use crate::grid::GridShape;

/// A 2D array of f32 values, row-major with latitude as the slow axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    data: Vec<f32>,
    shape: GridShape,
}

impl ScalarField {
    /// Wrap a row-major buffer. Fails if the length does not match the shape.
    pub fn new(data: Vec<f32>, n_lat: usize, n_lon: usize) -> FieldResult<Self> {
        if data.len() != n_lat * n_lon {
            return Err(FieldError::BadLength {
                len: data.len(),
                n_lat,
                n_lon,
            });
        }
        Ok(Self {
            data,
            shape: GridShape::new(n_lat, n_lon),
        })
    }

    /// A field with every cell set to `value`.
    pub fn filled(shape: GridShape, value: f32) -> Self {
        Self {
            data: vec![value; shape.len()],
            shape,
        }
    }

    /// A field whose cell at flat index `i` is `f(i)`.
    pub fn from_fn(shape: GridShape, f: impl FnMut(usize) -> f32) -> Self {
        Self {
            data: (0..shape.len()).map(f).collect(),
            shape,
        }
    }

    /// An all-`NaN` field, used for missing layers.
    pub fn missing(shape: GridShape) -> Self {
        Self::filled(shape, f32::NAN)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.shape.n_lat || col >= self.shape.n_lon {
            return None;
        }
        self.data.get(row * self.shape.n_lon + col).copied()
    }

    /// Produce a new field by applying `f` to every cell.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> ScalarField {
        ScalarField {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape,
        }
    }

    /// Number of `NaN` cells.
    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Whether every cell is `NaN`.
    pub fn is_all_missing(&self) -> bool {
        self.data.iter().all(|v| v.is_nan())
    }

    /// Summary statistics over the non-`NaN` cells.
    pub fn stats(&self) -> FieldStats {
        FieldStats::from_values(&self.data)
    }

    /// Fail with a shape error unless this field matches `expected`.
    pub fn ensure_shape(&self, expected: GridShape) -> FieldResult<()> {
        if self.shape != expected {
            return Err(FieldError::shape_mismatch(
                expected.as_tuple(),
                self.shape.as_tuple(),
            ));
        }
        Ok(())
    }
}

/// Summary statistics of a field's valid values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub valid: usize,
    pub total: usize,
}

impl FieldStats {
    /// Compute statistics over the non-`NaN` entries of `values`.
    pub fn from_values(values: &[f32]) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid = 0usize;

        for &v in values.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            valid += 1;
        }

        if valid == 0 {
            return Self {
                min: f32::NAN,
                max: f32::NAN,
                mean: f64::NAN,
                valid,
                total: values.len(),
            };
        }

        Self {
            min,
            max,
            mean: sum / valid as f64,
            valid,
            total: values.len(),
        }
    }

    /// Fraction of cells holding data (0.0 - 1.0).
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }
}

/// A (U, V) pair sharing one grid and one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    u: ScalarField,
    v: ScalarField,
    date: Option<NaiveDate>,
}

impl VectorField {
    /// Pair two components. Fails if their shapes differ.
    pub fn new(u: ScalarField, v: ScalarField) -> FieldResult<Self> {
        v.ensure_shape(u.shape())?;
        Ok(Self { u, v, date: None })
    }

    /// Attach the timestamp of the components.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// A vector field whose components are both all-`NaN`.
    pub fn missing(shape: GridShape) -> Self {
        Self {
            u: ScalarField::missing(shape),
            v: ScalarField::missing(shape),
            date: None,
        }
    }

    pub fn u(&self) -> &ScalarField {
        &self.u
    }

    pub fn v(&self) -> &ScalarField {
        &self.v
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn shape(&self) -> GridShape {
        self.u.shape()
    }

    /// Split into (U, V).
    pub fn into_components(self) -> (ScalarField, ScalarField) {
        (self.u, self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_field_length_check() {
        assert!(ScalarField::new(vec![0.0; 6], 2, 3).is_ok());
        let err = ScalarField::new(vec![0.0; 5], 2, 3).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_scalar_field_get() {
        let field = ScalarField::new((0..6).map(|i| i as f32).collect(), 2, 3).unwrap();
        assert_eq!(field.get(0, 0), Some(0.0));
        assert_eq!(field.get(1, 2), Some(5.0));
        assert_eq!(field.get(2, 0), None);
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let field = ScalarField::from_fn(GridShape::new(2, 3), |i| i as f32);
        assert_eq!(field.get(1, 0), Some(3.0));
    }

    #[test]
    fn test_map_produces_new_field() {
        let field = ScalarField::new(vec![1.0, 2.0, f32::NAN, 4.0], 2, 2).unwrap();
        let doubled = field.map(|v| v * 2.0);
        assert_eq!(field.get(0, 1), Some(2.0));
        assert_eq!(doubled.get(0, 1), Some(4.0));
        assert_eq!(doubled.nan_count(), 1);
    }

    #[test]
    fn test_stats_ignore_nan() {
        let stats = FieldStats::from_values(&[1.0, f32::NAN, 3.0, 5.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert_eq!(stats.valid, 3);
        assert!((stats.coverage() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_stats_all_nan() {
        let stats = ScalarField::missing(GridShape::new(2, 2)).stats();
        assert_eq!(stats.valid, 0);
        assert!(stats.max.is_nan());
    }

    #[test]
    fn test_vector_field_shape_mismatch() {
        let u = ScalarField::filled(GridShape::new(2, 3), 0.0);
        let v = ScalarField::filled(GridShape::new(3, 2), 0.0);
        let err = VectorField::new(u, v).unwrap_err();
        assert!(matches!(
            err,
            FieldError::ShapeMismatch {
                expected: (2, 3),
                actual: (3, 2)
            }
        ));
    }

    #[test]
    fn test_vector_field_date() {
        let shape = GridShape::new(1, 1);
        let date = NaiveDate::from_ymd_opt(2013, 2, 28).unwrap();
        let field = VectorField::missing(shape).with_date(date);
        assert_eq!(field.date(), Some(date));
        assert!(field.u().is_all_missing());
    }
}
