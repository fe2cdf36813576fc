//! Decoded scenes and the viewer session around them.
//!
//! ```text
//! bytes/file -> field::decode -> TensorReconstructor -> NeuralFieldEvaluator
//!                                                    -> OccupancyGridBuilder (RLE or derived)
//!            -> Scene (immutable) -> Viewer (camera, config, redraw scheduling)
//! ```

mod viewer;

pub use viewer::{RenderScheduler, Viewer, ViewerConfig};

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;

use crate::compute::{ComputeExecutor, DeviceStats};
use crate::field::{self, CompressedField, DecodedField};
use crate::network::NeuralFieldEvaluator;
use crate::occupancy::{OccupancyGrid, OccupancyGridBuilder};
use crate::reconstruct::TensorReconstructor;
use crate::render::{Camera, Frame, RenderSettings, VolumeRayMarcher};
use crate::util::Result;

/// A fully decoded, render-ready field. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Scene {
    field: CompressedField,
    evaluator: NeuralFieldEvaluator,
    grid: OccupancyGrid,
    settings: RenderSettings,
    device: DeviceStats,
}

impl Scene {
    /// Open a container file, memory-mapped when possible.
    pub fn open(path: impl AsRef<Path>, settings: RenderSettings) -> Result<Self> {
        Self::open_opts(path, settings, true)
    }

    /// Open a container file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, settings: RenderSettings, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        tracing::debug!(path = %path.display(), size, "opening scene");

        #[cfg(feature = "mmap")]
        {
            if use_mmap && size > 0 {
                // Safety: the map is read-only and dropped before this returns.
                let map = unsafe { memmap2::Mmap::map(&file) }?;
                return Self::from_slice(&map, settings);
            }
        }
        #[cfg(not(feature = "mmap"))]
        let _ = use_mmap;

        let mut file = file;
        let mut bytes = Vec::with_capacity(size as usize);
        std::io::Read::read_to_end(&mut file, &mut bytes)?;
        Self::from_slice(&bytes, settings)
    }

    /// Decode and build a scene from container bytes.
    #[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn from_slice(bytes: &[u8], settings: RenderSettings) -> Result<Self> {
        Self::from_decoded(field::decode(bytes)?, settings)
    }

    /// Build a scene from an already decoded container.
    pub fn from_decoded(decoded: DecodedField, settings: RenderSettings) -> Result<Self> {
        let DecodedField {
            field,
            factors,
            weights,
            grid_rles,
        } = decoded;
        let executor = ComputeExecutor::with_layout(settings.tile_layout);

        let features = TensorReconstructor::new(&executor).reconstruct(&field, factors)?;
        let evaluator = NeuralFieldEvaluator::new(features, Arc::new(weights), field.freqs.clone())?;

        let threshold = field.grid_threshold(settings.target_opacity);
        let builder = OccupancyGridBuilder::new(&executor, field.grid_res, threshold);
        let grid = match &grid_rles {
            Some(rles) => builder.from_rle(rles, settings.occupancy_margin, settings.occupancy_scale)?,
            None => builder.derive(&evaluator, settings.derived_grid_mips)?,
        };

        let device = executor.stats();
        tracing::info!(
            format = %field.format_tag,
            variant = field.variant.tag(),
            mips = grid.mips(),
            derived = grid_rles.is_none(),
            dispatches = device.dispatches,
            "scene loaded"
        );
        Ok(Self {
            field,
            evaluator,
            grid,
            settings,
            device,
        })
    }

    #[inline]
    pub fn field(&self) -> &CompressedField {
        &self.field
    }

    #[inline]
    pub fn evaluator(&self) -> &NeuralFieldEvaluator {
        &self.evaluator
    }

    #[inline]
    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    #[inline]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Executor counters after construction.
    #[inline]
    pub fn device_stats(&self) -> DeviceStats {
        self.device
    }

    /// Empty-space threshold shared by the grid and the marcher.
    #[inline]
    pub fn grid_threshold(&self) -> f32 {
        self.grid.threshold()
    }

    pub fn marcher(&self) -> VolumeRayMarcher<'_> {
        VolumeRayMarcher::new(&self.evaluator, &self.grid, self.field.render_step, &self.settings)
    }

    /// Render a `width x height` frame.
    pub fn render(&self, camera: &Camera, width: usize, height: usize) -> Frame {
        Frame::render(&self.marcher(), camera, width, height)
    }

    /// Camera seeded from the asset's pose, if it has one.
    pub fn initial_camera(&self) -> Option<Camera> {
        self.field
            .initial_pose
            .as_ref()
            .map(|pose| Camera::from_pose(pose, self.grid.aabb_scale()))
    }

    /// Up vector: `up_override`, then the asset's, then `+Y`.
    pub fn up(&self, up_override: Option<Vec3>) -> Vec3 {
        up_override.or(self.field.up).unwrap_or(Vec3::Y)
    }
}
