//! Occupancy grid construction.
//!
//! The grid comes either from the container's run-length tables or, when an
//! asset ships none, from evaluating the density branch at every cell.

mod derive;
mod grid;
mod rle;

pub use derive::{cell_center, level_to_scene, scene_to_level, DensityKernel, MaxReduceKernel};
pub use grid::{level_coord, mip_from_pos, OccupancyGrid};
pub use rle::{decode_rle, encode_rle};

use std::sync::Arc;

use half::f16;

use crate::compute::{Binding, ComputeExecutor, ElementType, KernelInputs, Texture3D};
use crate::field::checked_extent;
use crate::network::NeuralFieldEvaluator;
use crate::util::{Error, Result};

/// Builds [`OccupancyGrid`]s for one scene.
pub struct OccupancyGridBuilder<'a> {
    executor: &'a ComputeExecutor,
    grid_res: usize,
    threshold: f32,
}

impl<'a> OccupancyGridBuilder<'a> {
    /// `threshold` is the scene's `grid_th`, shared with the marcher.
    pub fn new(executor: &'a ComputeExecutor, grid_res: usize, threshold: f32) -> Self {
        Self {
            executor,
            grid_res,
            threshold,
        }
    }

    /// Decode per-level run lengths (cascade order). Occupied cells get
    /// `(threshold + margin) * scale`, saturated to the half-float range.
    #[tracing::instrument(skip_all, fields(mips = rles.len(), g = self.grid_res))]
    pub fn from_rle(&self, rles: &[Vec<usize>], margin: f32, scale: f32) -> Result<OccupancyGrid> {
        let occupied = ((self.threshold + margin) * scale).min(f16::MAX.to_f32());
        if occupied < self.threshold {
            tracing::warn!(
                threshold = self.threshold,
                "threshold exceeds half-float range, occupied cells will be skipped"
            );
        }
        let occupied = f16::from_f32(occupied);
        let levels = rles
            .iter()
            .enumerate()
            .map(|(i, runs)| {
                decode_rle(runs, self.grid_res, occupied)
                    .map_err(|e| Error::malformed(format!("grid_rles[{i}]: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        self.finish(levels)
    }

    /// Derive `mips` levels from the density branch of `evaluator`.
    #[tracing::instrument(skip_all, fields(mips = mips, g = self.grid_res))]
    pub fn derive(&self, evaluator: &NeuralFieldEvaluator, mips: usize) -> Result<OccupancyGrid> {
        if mips == 0 {
            return Err(Error::malformed("derived occupancy needs at least one level"));
        }
        let g = self.grid_res;
        let cells = checked_extent("occupancy grid", &[g; 3])?;
        let count = checked_extent("derived occupancy", &[mips, cells])?;

        let weights = evaluator.weights();
        let inputs = KernelInputs::new()
            .int("G", g)
            .int("Q", evaluator.grid().n_quants())
            .bind("volumes", Binding::Texture3DArray(evaluator.grid().shared_volumes()))
            .bind("density_weights", Binding::Mat4Array(Arc::from(weights.density.as_slice())))
            .bind("freqs", Binding::FloatArray(Arc::from(evaluator.freqs())))
            .float("density_bias", weights.density_bias);
        let raw = self
            .executor
            .execute(count, ElementType::Float16, 1, &inputs, &DensityKernel)?
            .into_f16()
            .ok_or_else(|| Error::device("density pass read back a non-half surface"))?;

        let raw_levels = raw
            .chunks_exact(cells)
            .map(|c| Texture3D::from_f16([g; 3], 1, c))
            .collect::<Result<Vec<_>>>()?;
        let inputs = KernelInputs::new()
            .int("G", g)
            .bind("levels", Binding::Texture3DArray(raw_levels.into()));
        let reduced = self
            .executor
            .execute(count, ElementType::Float16, 1, &inputs, &MaxReduceKernel)?
            .into_f16()
            .ok_or_else(|| Error::device("reduction pass read back a non-half surface"))?;

        self.finish(reduced.chunks_exact(cells).map(<[f16]>::to_vec).collect())
    }

    fn finish(&self, levels: Vec<Vec<f16>>) -> Result<OccupancyGrid> {
        let grid = OccupancyGrid::from_levels(self.grid_res, levels, self.threshold)?;
        let occupied = grid.occupied_cells();
        if occupied.iter().all(|&n| n == 0) {
            tracing::warn!("occupancy grid is empty, every ray will pass through");
        }
        tracing::debug!(?occupied, "occupancy grid ready");
        Ok(grid)
    }
}
