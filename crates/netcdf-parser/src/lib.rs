//! NetCDF readers for ocean velocity inputs.
//!
//! Two products are read:
//!
//! - CMEMS geostrophic velocity anomalies: `ugosa`/`vgosa` shaped
//!   `(time, latitude, longitude)` on 1D axes, one file covering many days.
//! - HYCOM currents: one file per date and depth, `u`/`v` shaped
//!   `(1, 1, Y, X)` on 2D `Longitude`/`Latitude` arrays.
//!
//! File access needs libnetcdf/HDF5 and lives behind the `native` feature.
//! Without it the dataset types, CF time decoding and unpacking remain
//! available and [`NATIVE_SUPPORT`] is `false`.

pub mod dataset;
pub mod error;
pub mod packing;
pub mod time;

#[cfg(feature = "native")]
pub mod native;

pub use dataset::{AnomalyDay, DepthLayer};
pub use error::{NetCdfError, NetCdfResult};
pub use packing::Packing;
pub use time::{TimeUnit, TimeUnits};

#[cfg(feature = "native")]
pub use native::{read_hycom_layer, silence_hdf5_errors, CmemsFile};

/// Whether file reading was compiled in.
pub const NATIVE_SUPPORT: bool = cfg!(feature = "native");
