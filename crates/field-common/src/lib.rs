//! Common types shared across the ocean-forcing crates.
//!
//! Everything downstream (the diffusivity estimator, the regridder, the
//! container codec) speaks in terms of the [`Grid`], [`ScalarField`] and
//! [`VectorField`] types defined here.

pub mod bbox;
pub mod error;
pub mod field;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{FieldError, FieldResult};
pub use field::{FieldStats, ScalarField, VectorField};
pub use grid::{Grid, GridShape, MAX_FALLBACK_CELLS};
pub use time::{compact_date, day_offset, parse_compact_date};
