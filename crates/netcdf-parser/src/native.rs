//! Native NetCDF reading using the netcdf library.

use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::NaiveDate;
use field_common::{Grid, ScalarField, VectorField};
use tracing::debug;

use crate::dataset::{cmems, hycom, AnomalyDay, DepthLayer};
use crate::error::{NetCdfError, NetCdfResult};
use crate::packing::Packing;
use crate::time::TimeUnits;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully (e.g. when probing for optional attributes). Call
/// once early in `main()`; safe to call repeatedly.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a documented
        // way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

fn open(path: &Path) -> NetCdfResult<netcdf::File> {
    silence_hdf5_errors();
    netcdf::open(path).map_err(|e| {
        NetCdfError::invalid(format!("Failed to open {}: {}", path.display(), e))
    })
}

fn variable<'f>(file: &'f netcdf::File, name: &str) -> NetCdfResult<netcdf::Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| NetCdfError::missing(format!("{name} variable")))
}

fn read_f64<E>(var: &netcdf::Variable, extents: E) -> NetCdfResult<Vec<f64>>
where
    E: TryInto<netcdf::Extents>,
    E::Error: Into<netcdf::Error>,
{
    var.get_values::<f64, _>(extents)
        .map_err(|e| NetCdfError::invalid(format!("Failed to read {}: {}", var.name(), e)))
}

/// A CMEMS daily anomaly file (`ugosa`/`vgosa` on 1D lon/lat axes).
pub struct CmemsFile {
    path: PathBuf,
    file: netcdf::File,
    grid: Grid,
    dates: Vec<NaiveDate>,
    u_packing: Packing,
    v_packing: Packing,
}

impl CmemsFile {
    /// Open a file and read its axes and time variable.
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open(&path)?;

        let lon = read_f64(&variable(&file, cmems::LONGITUDE)?, ..)?;
        let lat = read_f64(&variable(&file, cmems::LATITUDE)?, ..)?;
        let lon: Vec<f32> = lon.into_iter().map(|v| v as f32).collect();
        let lat: Vec<f32> = lat.into_iter().map(|v| v as f32).collect();
        let grid = Grid::from_axes(&lon, &lat)?;

        let time_var = variable(&file, cmems::TIME)?;
        let units = get_string_attr(&time_var, "units")
            .ok_or_else(|| NetCdfError::missing("time units attribute"))?;
        let units = TimeUnits::parse(&units)?;
        let dates = read_f64(&time_var, ..)?
            .into_iter()
            .map(|t| {
                units
                    .decode_date(t)
                    .ok_or_else(|| NetCdfError::invalid(format!("time value {t}")))
            })
            .collect::<NetCdfResult<Vec<_>>>()?;

        let u_packing = packing(&variable(&file, cmems::U)?);
        let v_packing = packing(&variable(&file, cmems::V)?);

        debug!(
            path = %path.display(),
            shape = %grid.shape(),
            days = dates.len(),
            "Opened CMEMS file"
        );

        Ok(Self {
            path,
            file,
            grid,
            dates,
            u_packing,
            v_packing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grid of the 1D longitude/latitude axes.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Read the anomaly components of the `index`-th time step.
    pub fn read_day(&self, index: usize) -> NetCdfResult<AnomalyDay> {
        let date = *self
            .dates
            .get(index)
            .ok_or_else(|| NetCdfError::invalid(format!("time index {index} out of range")))?;
        let shape = self.grid.shape();

        let u_raw = read_f64(&variable(&self.file, cmems::U)?, (index, .., ..))?;
        let v_raw = read_f64(&variable(&self.file, cmems::V)?, (index, .., ..))?;

        let u = ScalarField::new(self.u_packing.unpack_all(&u_raw), shape.n_lat, shape.n_lon)?;
        let v = ScalarField::new(self.v_packing.unpack_all(&v_raw), shape.n_lat, shape.n_lon)?;

        Ok(AnomalyDay {
            date,
            velocity: VectorField::new(u, v)?.with_date(date),
        })
    }
}

/// Read one HYCOM depth file: `u`/`v` shaped `(1, 1, Y, X)` on 2D coordinates.
pub fn read_hycom_layer(path: impl AsRef<Path>, depth: f64) -> NetCdfResult<DepthLayer> {
    let path = path.as_ref();
    let file = open(path)?;

    let u_var = variable(&file, hycom::U)?;
    let v_var = variable(&file, hycom::V)?;
    let dims: Vec<usize> = u_var.dimensions().iter().map(|d| d.len()).collect();
    let [_, _, n_lat, n_lon] = dims[..] else {
        return Err(NetCdfError::invalid(format!(
            "{} has dimensions {:?}, expected (MT, Depth, Y, X)",
            hycom::U,
            dims
        )));
    };

    let u = packing(&u_var).unpack_all(&read_f64(&u_var, (0, 0, .., ..))?);
    let v = packing(&v_var).unpack_all(&read_f64(&v_var, (0, 0, .., ..))?);

    let lon = read_f64(&variable(&file, hycom::LONGITUDE)?, ..)?;
    let lat = read_f64(&variable(&file, hycom::LATITUDE)?, ..)?;
    let grid = Grid::new(
        lon.into_iter().map(|v| v as f32).collect(),
        lat.into_iter().map(|v| v as f32).collect(),
        n_lat,
        n_lon,
    )?;

    let velocity = VectorField::new(
        ScalarField::new(u, n_lat, n_lon)?,
        ScalarField::new(v, n_lat, n_lon)?,
    )?;

    debug!(
        path = %path.display(),
        depth,
        shape = %grid.shape(),
        missing = velocity.u().nan_count(),
        "Read HYCOM layer"
    );

    Ok(DepthLayer {
        depth,
        velocity,
        grid,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

fn packing(var: &netcdf::Variable) -> Packing {
    Packing {
        scale_factor: get_f64_attr(var, "scale_factor").unwrap_or(1.0),
        add_offset: get_f64_attr(var, "add_offset").unwrap_or(0.0),
        fill_value: get_f64_attr(var, "_FillValue"),
        missing_value: get_f64_attr(var, "missing_value"),
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
