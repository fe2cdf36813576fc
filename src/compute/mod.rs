//! Data-parallel compute dispatch.
//!
//! Provides the tiled index space, named kernel inputs, GPU-style textures and
//! the executor that maps a kernel over an output array.
//!
//! ## Architecture
//! ```text
//! KernelInputs + Kernel → ComputeExecutor::execute (rayon over tile rows) → DenseArray
//! ```

mod executor;
mod inputs;
mod texture;
mod tiling;

pub use executor::{ComputeExecutor, DenseArray, DeviceStats, ElementType, FnKernel, Kernel, KernelFn};
pub use inputs::{Binding, KernelInputs};
pub use texture::{Texture2D, Texture3D};
pub use tiling::{TileLayout, TILE_MAX_HEIGHT, TILE_MAX_WIDTH};
