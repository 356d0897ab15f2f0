//! Field processing stages for ocean forcing preparation.
//!
//! Each stage is a pure function of its inputs and a shared
//! [`ProcessingConfig`]:
//!
//! ```text
//! anomaly (u, v) ──► estimate_diffusivity ──► regrid ──► quantize ──► container
//!
//! per-depth handles ──► StackAssembler ──► DepthStack (regridded) ──► container
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{estimate_diffusivity, quantize, regrid, ProcessingConfig};
//!
//! let config = ProcessingConfig::from_env();
//! let k = estimate_diffusivity(&anomaly, &config.diffusivity)?;
//! let on_target = regrid(&k.field, &source_grid, &target_grid, &config.regrid)?;
//! let encoded = quantize(&on_target);
//! encoded.check(&config.precision);
//! ```

pub mod config;
pub mod diffusivity;
pub mod error;
pub mod precision;
pub mod regrid;
pub mod stack;

pub use config::{
    AdaptiveCapConfig, DiffusivityConfig, PrecisionConfig, ProcessingConfig, RegridConfig,
};
pub use diffusivity::{estimate_diffusivity, estimate_from_components, CapApplied, DiffusivityEstimate};
pub use error::{GridProcessorError, Result};
pub use precision::{dequantize, quantize, QuantizedField};
pub use regrid::{
    regrid, regrid_vector, regrid_with_coverage, GeoPoint, Regridded, RegularGridInterpolator,
    SeparableAxes,
};
pub use stack::{
    DepthStack, FillReason, FilledLevel, LayerCatalog, LayerSource, StackAssembler, StackLayer,
};
