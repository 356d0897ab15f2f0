//! Types produced by the readers.

use chrono::NaiveDate;
use field_common::{Grid, VectorField};

/// One day of geostrophic velocity anomalies.
#[derive(Debug, Clone)]
pub struct AnomalyDay {
    pub date: NaiveDate,
    /// `(ugosa, vgosa)` in m/s.
    pub velocity: VectorField,
}

/// One depth layer of a current-model file.
#[derive(Debug, Clone)]
pub struct DepthLayer {
    pub depth: f64,
    /// `(u, v)` in m/s.
    pub velocity: VectorField,
    /// Grid from the file's 2D coordinate arrays.
    pub grid: Grid,
}

/// Variable names of a CMEMS anomaly file.
pub mod cmems {
    pub const U: &str = "ugosa";
    pub const V: &str = "vgosa";
    pub const LONGITUDE: &str = "longitude";
    pub const LATITUDE: &str = "latitude";
    pub const TIME: &str = "time";
}

/// Variable names of a HYCOM depth file.
pub mod hycom {
    pub const U: &str = "u";
    pub const V: &str = "v";
    pub const LONGITUDE: &str = "Longitude";
    pub const LATITUDE: &str = "Latitude";
}
