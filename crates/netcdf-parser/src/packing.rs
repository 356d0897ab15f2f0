//! CF packing attributes (`scale_factor`, `add_offset`, `_FillValue`).

/// How raw stored values map to physical values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
            missing_value: None,
        }
    }
}

impl Packing {
    /// Physical value of one raw value; fill and missing markers become `NaN`.
    pub fn unpack(&self, raw: f64) -> f32 {
        if raw.is_nan() || Some(raw) == self.fill_value || Some(raw) == self.missing_value {
            return f32::NAN;
        }
        (raw * self.scale_factor + self.add_offset) as f32
    }

    pub fn unpack_all(&self, raw: &[f64]) -> Vec<f32> {
        raw.iter().map(|&v| self.unpack(v)).collect()
    }
}
