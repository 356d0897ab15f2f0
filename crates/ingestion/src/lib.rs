//! Preparation pipelines for the particle-tracking simulator's forcing files.
//!
//! # Architecture
//!
//! This crate is the glue between the readers, the processing stages and
//! the containers. It handles:
//!
//! - Configuration loading (YAML with `${VAR}` substitution)
//! - Input discovery by naming convention
//! - The EKE diffusivity pipeline ([`EkePipeline`])
//! - The 3D currents pipeline ([`CurrentsPipeline`])
//! - JSON manifests and per-run batch reports
//!
//! Readers are injected through the traits in [`source`]; with the
//! `netcdf` feature, [`source::NetCdfInputs`] reads real files.

pub mod config;
pub mod currents;
pub mod discovery;
pub mod eke;
pub mod error;
pub mod manifest;
pub mod report;
pub mod source;

// Re-exports
pub use config::{CurrentsConfig, EkeConfig, PreparerConfig};
pub use currents::CurrentsPipeline;
pub use eke::EkePipeline;
pub use error::{IngestionError, Result};
pub use manifest::{CurrentsMetadata, EkeMetadata};
pub use report::{BatchReport, RunSummary, UnitFailure};
pub use source::{AnomalyOpener, AnomalySource, DepthHandle, DepthReader};

#[cfg(feature = "netcdf")]
pub use source::NetCdfInputs;
