//! Error types for field processing.

use field_common::FieldError;
use thiserror::Error;

/// Errors that can occur while processing fields.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Grid or field construction failed (shape mismatch, bad buffer).
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A depth stack could not be built at all.
    #[error("failed to build depth stack: {0}")]
    StackBuild(String),

    /// Interpolation could not be set up.
    #[error("interpolation error: {0}")]
    Interpolation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GridProcessorError {
    /// Create a StackBuild error.
    pub fn stack_build(msg: impl Into<String>) -> Self {
        Self::StackBuild(msg.into())
    }

    /// Create an Interpolation error.
    pub fn interpolation(msg: impl Into<String>) -> Self {
        Self::Interpolation(msg.into())
    }

    /// Whether this error only concerns the shape of one unit's data.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::Field(e) if e.is_shape_error())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
