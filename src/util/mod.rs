//! Utility types and functions for nerfpack.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and ray/box helpers
//! - [`logging`] - tracing subscriber setup

mod error;
mod math;
pub mod logging;

pub use error::*;
pub use math::*;
