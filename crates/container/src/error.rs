//! Error types for container encoding and decoding.

use field_common::FieldError;
use thiserror::Error;

/// Errors raised while reading or writing containers.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The leading version integer is not one this crate knows.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(i32),

    /// The buffer ends before the layout says it should.
    #[error("container truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The bytes do not match any agreed layout.
    #[error("malformed container: {0}")]
    Malformed(String),

    /// Grid or field construction failed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Grid-processor error.
    #[error(transparent)]
    Processing(#[from] grid_processor::GridProcessorError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    /// Create a Malformed error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Fail with `Truncated` if `actual < expected`.
    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
        if actual < expected {
            return Err(Self::Truncated { expected, actual });
        }
        Ok(())
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
