//! Error types for NetCDF parsing operations.

use field_common::FieldError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Arrays read from the file do not form a valid grid or field
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The crate was built without the `native` feature
    #[error("NetCDF support is not compiled in (enable the `native` feature)")]
    NotCompiled,
}

impl NetCdfError {
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}
