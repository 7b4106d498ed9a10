//! Utility types and functions for the exporter.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus transform helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
