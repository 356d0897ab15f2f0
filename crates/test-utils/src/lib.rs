//! Shared test utilities for the ocean-forcing workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic grid and field generators
//! - Fixture extents and dates
//! - Scratch directory helpers
//! - Approximate-equality assertions
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(30.2400009_f32, 30.24_f64, 1e-3);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert every value of a slice is within `epsilon` of `expected`.
#[macro_export]
macro_rules! assert_all_approx_eq {
    ($values:expr, $expected:expr, $epsilon:expr) => {{
        for (idx, value) in $values.iter().enumerate() {
            let diff = (*value as f64 - $expected as f64).abs();
            if !(diff <= $epsilon as f64) {
                panic!(
                    "assertion failed at index {}: `{:?}` is not within {:?} of `{:?}`",
                    idx, value, $epsilon, $expected
                );
            }
        }
    }};
}

/// Assert every value of a slice is `NaN`.
#[macro_export]
macro_rules! assert_all_nan {
    ($values:expr) => {{
        if let Some(idx) = $values.iter().position(|v: &f32| !v.is_nan()) {
            panic!(
                "expected all NaN, found `{:?}` at index {}",
                $values[idx], idx
            );
        }
    }};
}
