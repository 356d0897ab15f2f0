//! Error types for grid and field construction.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while building grids and fields.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The grid source is absent, malformed, or inconsistent.
    #[error("failed to load grid: {0}")]
    GridLoad(String),

    /// Two arrays that must share a shape do not.
    #[error("field shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A buffer length does not match the declared shape.
    #[error("buffer of {len} values does not fit a {n_lat}x{n_lon} grid")]
    BadLength { len: usize, n_lat: usize, n_lon: usize },

    /// An interpolation axis needs at least two points.
    #[error("{axis} axis has {len} point(s), need at least 2")]
    DegenerateAxis { axis: &'static str, len: usize },

    /// Coordinates must be finite.
    #[error("non-finite coordinate at flat index {0}")]
    NonFiniteCoordinate(usize),

    /// Invalid synthetic grid parameters.
    #[error("invalid grid definition: {0}")]
    InvalidDefinition(String),
}

impl FieldError {
    /// Create a GridLoad error.
    pub fn grid_load(msg: impl Into<String>) -> Self {
        Self::GridLoad(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::ShapeMismatch { expected, actual }
    }

    /// Whether this error is a shape problem (fatal for one unit only).
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::BadLength { .. } | Self::DegenerateAxis { .. }
        )
    }
}
