//! Error types for the ingestion crate.

use thiserror::Error;

/// Errors that can occur while preparing a batch.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse NetCDF data: {0}")]
    NetcdfParse(#[from] netcdf_parser::NetCdfError),

    #[error(transparent)]
    Field(#[from] field_common::FieldError),

    #[error(transparent)]
    Processing(#[from] grid_processor::GridProcessorError),

    #[error(transparent)]
    Container(#[from] container::ContainerError),

    #[error("Failed to write metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No input found: {0}")]
    NoInput(String),
}

impl IngestionError {
    /// Whether the whole run must stop (as opposed to one unit failing).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestionError::InvalidConfig(_)
                | IngestionError::NoInput(_)
                | IngestionError::Field(field_common::FieldError::GridLoad(_))
        )
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
