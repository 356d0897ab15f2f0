//! Half-precision encoding of 2D fields with error accounting.

use field_common::{FieldResult, GridShape, ScalarField};
use half::f16;
use tracing::{debug, warn};

use crate::config::PrecisionConfig;

/// A field narrowed to f16 plus the round-trip error it incurred.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedField {
    values: Vec<f16>,
    shape: GridShape,
    max_abs_error: f32,
    mean_abs_error: f32,
}

impl QuantizedField {
    pub fn values(&self) -> &[f16] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f16> {
        self.values
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Largest `|original - widened|` over finite input cells.
    pub fn max_abs_error(&self) -> f32 {
        self.max_abs_error
    }

    /// Mean `|original - widened|` over finite input cells.
    pub fn mean_abs_error(&self) -> f32 {
        self.mean_abs_error
    }

    /// `trunc(max_abs_error * 1000)`, as stored in the daily container header.
    ///
    /// Saturates at `i32::MAX` for an infinite error.
    pub fn scaled_max_error(&self) -> i32 {
        (self.max_abs_error as f64 * 1000.0).trunc() as i32
    }

    /// Whether the max error is above `threshold`.
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.max_abs_error > threshold
    }

    /// Log a warning if the error is above the configured threshold.
    ///
    /// Returns whether the unit should be flagged. Never an error.
    pub fn check(&self, config: &PrecisionConfig) -> bool {
        let flagged = self.exceeds(config.warning_threshold);
        if flagged {
            warn!(
                max_error = self.max_abs_error,
                threshold = config.warning_threshold,
                "Half-precision error above threshold"
            );
        }
        flagged
    }

    /// Widen back to f32.
    pub fn dequantize(&self) -> ScalarField {
        ScalarField::from_fn(self.shape, |i| self.values[i].to_f32())
    }
}

/// Narrow a field to f16, measuring the round-trip error.
///
/// `NaN` cells stay `NaN` and are left out of the error; so are infinite
/// inputs. A finite value beyond the f16 range becomes infinite and makes
/// the error infinite.
pub fn quantize(field: &ScalarField) -> QuantizedField {
    let values: Vec<f16> = field.data().iter().map(|&v| f16::from_f32(v)).collect();

    let mut max = 0.0f32;
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (&original, &half) in field.data().iter().zip(&values) {
        if !original.is_finite() {
            continue;
        }
        let err = (original - half.to_f32()).abs();
        max = max.max(err);
        sum += err as f64;
        count += 1;
    }
    let mean = if count == 0 { 0.0 } else { (sum / count as f64) as f32 };

    debug!(
        cells = values.len(),
        max_error = max,
        mean_error = mean,
        "Quantized field to f16"
    );

    QuantizedField {
        values,
        shape: field.shape(),
        max_abs_error: max,
        mean_abs_error: mean,
    }
}

/// Widen f16 values to an f32 field. Exact.
pub fn dequantize(values: &[f16], shape: GridShape) -> FieldResult<ScalarField> {
    ScalarField::new(
        values.iter().map(|v| v.to_f32()).collect(),
        shape.n_lat,
        shape.n_lon,
    )
}
