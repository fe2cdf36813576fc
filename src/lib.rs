//! # nerfpack
//!
//! Decoder and CPU renderer for low-rank compressed neural radiance fields.
//!
//! An asset is a single CBOR container holding factorized feature tensors, a
//! small fixed-weight network and optionally a run-length encoded occupancy
//! cascade. Loading reconstructs the dense feature volumes, builds (or
//! derives) the occupancy grid, and yields a [`Scene`] that can be ray
//! marched into a [`Frame`].
//!
//! ## Modules
//!
//! - [`util`] - Errors, math helpers, logging setup
//! - [`compute`] - Tiled data-parallel kernel dispatch and textures
//! - [`field`] - Container decoding
//! - [`reconstruct`] - Factor buffers to dense feature volumes
//! - [`network`] - Feature encoding and the field network
//! - [`occupancy`] - Multi-level occupancy grids
//! - [`render`] - Camera rays, the volume ray marcher, frames
//! - [`scene`] - Loaded scenes and the viewer session
//!
//! ## Example
//!
//! ```ignore
//! use nerfpack::prelude::*;
//!
//! let scene = Scene::open("lego.cbor", RenderSettings::default())?;
//! let camera = scene.initial_camera().unwrap_or_default();
//! let frame = scene.render(&camera, 256, 256);
//! let rgba = frame.over(Vec4::new(1.0, 1.0, 1.0, 1.0)).to_rgba8();
//! ```

pub mod util;
pub mod compute;
pub mod field;
pub mod reconstruct;
pub mod network;
pub mod occupancy;
pub mod render;
pub mod scene;

pub use util::logging;

// Re-export commonly used types
pub use util::{Error, Result};
pub use render::{Camera, Frame, RenderSettings};
pub use scene::{Scene, Viewer, ViewerConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, Vec3, Vec4};
    pub use crate::render::{Camera, Frame, RenderSettings};
    pub use crate::scene::{RenderScheduler, Scene, Viewer, ViewerConfig};
}
