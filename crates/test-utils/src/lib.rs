//! Shared test utilities for the precipitation graph preprocessing workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic high-resolution node clouds
//! - Scenario fixtures (windows, per-year time indices, on-disk inputs)
//! - Float assertion macros
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{create_node_lattice, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert two `f32` slices are identical bit for bit, NaN included.
#[macro_export]
macro_rules! assert_bits_eq {
    ($left:expr, $right:expr) => {{
        let left: Vec<u32> = $left.iter().map(|v: &f32| v.to_bits()).collect();
        let right: Vec<u32> = $right.iter().map(|v: &f32| v.to_bits()).collect();
        assert_eq!(left, right, "arrays differ bitwise");
    }};
}
