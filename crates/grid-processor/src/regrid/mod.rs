//! Resampling fields from one grid onto another.

pub mod interpolation;

pub use interpolation::{Axis, GeoPoint, RegularGridInterpolator, SeparableAxes};

use field_common::{Grid, ScalarField, VectorField};
use tracing::{debug, warn};

use crate::config::RegridConfig;
use crate::error::Result;

/// Coordinate tolerance (degrees) for treating a grid as rectilinear.
const RECTILINEAR_TOLERANCE: f32 = 1e-4;

/// A regridded field plus how many target points fell outside the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Regridded {
    field: ScalarField,
    out_of_domain: usize,
}

impl Regridded {
    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn into_field(self) -> ScalarField {
        self.field
    }

    /// Target points that received the fill value.
    pub fn out_of_domain(&self) -> usize {
        self.out_of_domain
    }

    /// Fraction of target points that received the fill value.
    pub fn out_of_domain_fraction(&self) -> f64 {
        if self.field.is_empty() {
            0.0
        } else {
            self.out_of_domain as f64 / self.field.len() as f64
        }
    }
}

/// Resample `field` (living on `source`) onto `target` with bilinear interpolation.
///
/// The output always has the target's shape. Target points outside the
/// source extent get `config.fill_value`.
pub fn regrid(
    field: &ScalarField,
    source: &Grid,
    target: &Grid,
    config: &RegridConfig,
) -> Result<ScalarField> {
    Ok(regrid_with_coverage(field, source, target, config)?.into_field())
}

/// Like [`regrid`], also counting the target points left at the fill value.
pub fn regrid_with_coverage(
    field: &ScalarField,
    source: &Grid,
    target: &Grid,
    config: &RegridConfig,
) -> Result<Regridded> {
    field.ensure_shape(source.shape())?;

    if !source.is_rectilinear(RECTILINEAR_TOLERANCE) {
        warn!(
            shape = %source.shape(),
            "Source grid is not rectilinear; using first row/column as axes"
        );
    }

    let axes = SeparableAxes::from_grid(source)?;
    let interp = RegularGridInterpolator::new(axes, field.data(), config.fill_value)?;

    let mut out_of_domain = 0usize;
    let data: Vec<f32> = target
        .longitude()
        .iter()
        .zip(target.latitude())
        .map(|(&lon, &lat)| {
            interp
                .try_sample(GeoPoint::new(lon as f64, lat as f64))
                .unwrap_or_else(|| {
                    out_of_domain += 1;
                    config.fill_value
                })
        })
        .collect();

    debug!(
        source = %source.shape(),
        target = %target.shape(),
        out_of_domain,
        fill_value = config.fill_value,
        "Regridded field"
    );

    Ok(Regridded {
        field: ScalarField::new(data, target.n_lat(), target.n_lon())?,
        out_of_domain,
    })
}

/// Regrid both components of a vector field. The date is carried over.
pub fn regrid_vector(
    field: &VectorField,
    source: &Grid,
    target: &Grid,
    config: &RegridConfig,
) -> Result<VectorField> {
    let u = regrid(field.u(), source, target, config)?;
    let v = regrid(field.v(), source, target, config)?;
    let out = VectorField::new(u, v)?;
    Ok(match field.date() {
        Some(date) => out.with_date(date),
        None => out,
    })
}
