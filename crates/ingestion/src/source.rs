//! Input readers behind traits.
//!
//! The pipelines only see these traits. The NetCDF implementations need
//! the `netcdf` feature; tests supply in-memory ones.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use field_common::{Grid, VectorField};
use grid_processor::LayerSource;
use netcdf_parser::{AnomalyDay, DepthLayer};

use crate::error::{IngestionError, Result};

/// A multi-day anomaly input such as one CMEMS file.
pub trait AnomalySource {
    /// Native grid shared by every day.
    fn grid(&self) -> &Grid;

    /// Dates in storage order.
    fn dates(&self) -> &[NaiveDate];

    /// Read the day at `index`.
    fn read_day(&self, index: usize) -> Result<AnomalyDay>;
}

/// Opens anomaly inputs by path.
pub trait AnomalyOpener {
    type Source: AnomalySource;

    fn open(&self, path: &Path) -> Result<Self::Source>;
}

/// Reads one depth of a current-model file.
pub trait DepthReader {
    fn read_depth(&self, path: &Path, depth: f64) -> Result<DepthLayer>;
}

/// Lazy handle to one depth file, read during stack assembly.
#[derive(Debug)]
pub struct DepthHandle<'a, R> {
    reader: &'a R,
    path: PathBuf,
    depth: f64,
}

impl<'a, R: DepthReader> DepthHandle<'a, R> {
    pub fn new(reader: &'a R, path: impl Into<PathBuf>, depth: f64) -> Self {
        Self {
            reader,
            path: path.into(),
            depth,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: DepthReader> LayerSource for DepthHandle<'_, R> {
    type Layer = VectorField;
    type Error = IngestionError;

    fn read_layer(&self) -> Result<(VectorField, Grid)> {
        let layer = self.reader.read_depth(&self.path, self.depth)?;
        Ok((layer.velocity, layer.grid))
    }
}

/// NetCDF-backed readers.
#[cfg(feature = "netcdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfInputs;

#[cfg(feature = "netcdf")]
impl NetCdfInputs {
    /// Suppress HDF5's stderr error stack before any file is opened.
    pub fn new() -> Self {
        netcdf_parser::silence_hdf5_errors();
        Self
    }
}

#[cfg(feature = "netcdf")]
impl AnomalySource for netcdf_parser::CmemsFile {
    fn grid(&self) -> &Grid {
        netcdf_parser::CmemsFile::grid(self)
    }

    fn dates(&self) -> &[NaiveDate] {
        netcdf_parser::CmemsFile::dates(self)
    }

    fn read_day(&self, index: usize) -> Result<AnomalyDay> {
        Ok(netcdf_parser::CmemsFile::read_day(self, index)?)
    }
}

#[cfg(feature = "netcdf")]
impl AnomalyOpener for NetCdfInputs {
    type Source = netcdf_parser::CmemsFile;

    fn open(&self, path: &Path) -> Result<Self::Source> {
        Ok(netcdf_parser::CmemsFile::open(path)?)
    }
}

#[cfg(feature = "netcdf")]
impl DepthReader for NetCdfInputs {
    fn read_depth(&self, path: &Path, depth: f64) -> Result<DepthLayer> {
        Ok(netcdf_parser::read_hycom_layer(path, depth)?)
    }
}
