//! Parallel kernel dispatch over a 2D tile.
//!
//! A dispatch runs a kernel once per logical output index and reads the
//! results back in index order:
//!
//! ```text
//! plan tile -> acquire surface -> link kernel -> run rows in parallel -> read back
//! ```
//!
//! The surface and the linked program are RAII guards, so both are released
//! whether the dispatch finishes or bails out early.

use std::sync::Arc;

use glam::Vec4;
use half::f16;
use parking_lot::Mutex;
use rayon::prelude::*;

use super::inputs::KernelInputs;
use super::tiling::TileLayout;
use crate::util::{Error, Result};

/// Storage type of dispatch output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Float16,
    Float32,
    /// Normalized: `[0, 1]` maps to `0..=255`.
    Uint8,
}

/// Dense dispatch result, `count * channels` values in index order.
#[derive(Clone, Debug, PartialEq)]
pub enum DenseArray {
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Uint8(Vec<u8>),
}

impl DenseArray {
    pub fn len(&self) -> usize {
        match self {
            Self::Float16(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Uint8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Float16(_) => ElementType::Float16,
            Self::Float32(_) => ElementType::Float32,
            Self::Uint8(_) => ElementType::Uint8,
        }
    }

    /// Borrow half-float output; `None` for other element types.
    pub fn as_f16(&self) -> Option<&[f16]> {
        match self {
            Self::Float16(v) => Some(v),
            _ => None,
        }
    }

    /// Take half-float output; `None` for other element types.
    pub fn into_f16(self) -> Option<Vec<f16>> {
        match self {
            Self::Float16(v) => Some(v),
            _ => None,
        }
    }

    /// Widen any output to `f32` (`Uint8` maps back to `[0, 1]`).
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Self::Float16(v) => v.iter().map(|x| x.to_f32()).collect(),
            Self::Float32(v) => v.clone(),
            Self::Uint8(v) => v.iter().map(|&x| x as f32 / 255.0).collect(),
        }
    }
}

/// Linked per-element program: logical index -> up to four channel values.
pub type KernelFn<'a> = Box<dyn Fn(usize) -> Vec4 + Send + Sync + 'a>;

/// A data-parallel kernel.
///
/// `link` resolves named inputs once per dispatch; the returned closure is
/// then invoked independently for every output index.
pub trait Kernel: Sync {
    fn label(&self) -> &str;

    fn link<'a>(&'a self, inputs: &'a KernelInputs) -> Result<KernelFn<'a>>;
}

/// Kernel built from a closure that reads its inputs directly.
pub struct FnKernel<F> {
    label: &'static str,
    body: F,
}

impl<F> FnKernel<F>
where
    F: Fn(usize, &KernelInputs) -> Vec4 + Send + Sync,
{
    pub fn new(label: &'static str, body: F) -> Self {
        Self { label, body }
    }
}

impl<F> Kernel for FnKernel<F>
where
    F: Fn(usize, &KernelInputs) -> Vec4 + Send + Sync,
{
    fn label(&self) -> &str {
        self.label
    }

    fn link<'a>(&'a self, inputs: &'a KernelInputs) -> Result<KernelFn<'a>> {
        Ok(Box::new(move |i| (self.body)(i, inputs)))
    }
}

/// Counters of device-side resources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Output surfaces currently allocated.
    pub live_surfaces: usize,
    /// Linked programs currently alive.
    pub live_programs: usize,
    /// Dispatches that completed and read back.
    pub dispatches: usize,
    /// Total elements produced by completed dispatches.
    pub elements: usize,
}

/// Output tile; releases its slot in [`DeviceStats`] on drop.
struct Surface<'a> {
    stats: &'a Mutex<DeviceStats>,
    texels: Vec<f32>,
}

impl<'a> Surface<'a> {
    fn allocate(stats: &'a Mutex<DeviceStats>, len: usize) -> Result<Self> {
        let mut texels = Vec::new();
        texels
            .try_reserve_exact(len)
            .map_err(|e| Error::device(format!("surface allocation of {len} texels failed: {e}")))?;
        texels.resize(len, 0.0);
        stats.lock().live_surfaces += 1;
        Ok(Self { stats, texels })
    }
}

impl Drop for Surface<'_> {
    fn drop(&mut self) {
        self.stats.lock().live_surfaces -= 1;
    }
}

/// Linked kernel; releases its slot in [`DeviceStats`] on drop.
struct Program<'a> {
    stats: &'a Mutex<DeviceStats>,
    run: KernelFn<'a>,
}

impl<'a> Program<'a> {
    fn link<K: Kernel + ?Sized>(
        stats: &'a Mutex<DeviceStats>,
        kernel: &'a K,
        inputs: &'a KernelInputs,
    ) -> Result<Self> {
        let run = kernel.link(inputs).map_err(|e| match e {
            Error::DeviceResourceFailure(msg) => {
                Error::device(format!("linking kernel '{}': {msg}", kernel.label()))
            }
            other => other,
        })?;
        stats.lock().live_programs += 1;
        Ok(Self { stats, run })
    }
}

impl Drop for Program<'_> {
    fn drop(&mut self) {
        self.stats.lock().live_programs -= 1;
    }
}

/// Executes kernels over a tiled index space.
#[derive(Clone, Debug, Default)]
pub struct ComputeExecutor {
    layout: TileLayout,
    stats: Arc<Mutex<DeviceStats>>,
}

impl ComputeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor with a custom tile shape.
    pub fn with_layout(layout: TileLayout) -> Self {
        Self {
            layout,
            stats: Arc::default(),
        }
    }

    #[inline]
    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    /// Snapshot of the resource counters.
    pub fn stats(&self) -> DeviceStats {
        *self.stats.lock()
    }

    /// Run `kernel` for every index in `0..count`.
    ///
    /// Returns `count * channels` values in index order. `channels` must be
    /// 1 or 4; single-channel dispatches keep the kernel's `x` component.
    #[tracing::instrument(skip_all, fields(kernel = kernel.label(), count = count, channels = channels))]
    pub fn execute<K: Kernel + ?Sized>(
        &self,
        count: usize,
        element: ElementType,
        channels: usize,
        inputs: &KernelInputs,
        kernel: &K,
    ) -> Result<DenseArray> {
        if channels != 1 && channels != 4 {
            return Err(Error::unsupported(format!("{channels}-channel dispatch output")));
        }
        let rows = self.layout.plan(count)?;
        let row_len = self.layout.max_width * channels;

        let mut surface = Surface::allocate(&self.stats, rows * row_len)?;
        let program = Program::link(&self.stats, kernel, inputs)?;

        let layout = self.layout;
        surface
            .texels
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(row, texels)| {
                for col in 0..layout.max_width {
                    let index = layout.index(row, col);
                    if index >= count {
                        break;
                    }
                    let value = (program.run)(index);
                    let out = &mut texels[col * channels..(col + 1) * channels];
                    out.copy_from_slice(&value.to_array()[..channels]);
                }
            });

        let result = read_back(&surface.texels[..count * channels], element);
        drop(program);
        drop(surface);

        let mut stats = self.stats.lock();
        stats.dispatches += 1;
        stats.elements += count;
        tracing::debug!(rows, "dispatch complete");
        Ok(result)
    }
}

fn read_back(texels: &[f32], element: ElementType) -> DenseArray {
    match element {
        ElementType::Float16 => DenseArray::Float16(texels.iter().map(|&v| f16::from_f32(v)).collect()),
        ElementType::Float32 => DenseArray::Float32(texels.to_vec()),
        ElementType::Uint8 => DenseArray::Uint8(
            texels
                .iter()
                .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
        ),
    }
}
