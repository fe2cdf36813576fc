//! Occupancy derived from the density branch.
//!
//! Two dispatches over all `M * G^3` cells, flat index `level * G^3 + cell`:
//!
//! 1. [`DensityKernel`]: density at every cell center.
//! 2. [`MaxReduceKernel`]: each cell keeps the maximum of itself and the
//!    finer-level cells containing its center.

use glam::{Vec3, Vec4};

use crate::compute::{Kernel, KernelFn, KernelInputs};
use crate::network::{activate_density, encode, weights::grouped_matmul};
use crate::util::{Error, Result};

/// Level-local coordinates of a cell center.
#[inline]
pub fn cell_center(cell: usize, grid_res: usize) -> Vec3 {
    let (x, y, z) = (cell % grid_res, (cell / grid_res) % grid_res, cell / (grid_res * grid_res));
    (Vec3::new(x as f32, y as f32, z as f32) + 0.5) / grid_res as f32
}

/// Scene coordinates of a level-local point on cascade level `level`.
#[inline]
pub fn level_to_scene(local: Vec3, level: usize) -> Vec3 {
    (local - 0.5) * (1u64 << level) as f32 + 0.5
}

/// Level-local coordinates of a scene point on cascade level `level`.
#[inline]
pub fn scene_to_level(p: Vec3, level: usize) -> Vec3 {
    (p - 0.5) / (1u64 << level) as f32 + 0.5
}

/// Density at every cell center of every level.
///
/// Inputs: `G`, `Q` (ints), `volumes` (feature volumes), `density_weights`
/// (`F*2*4` blocks), `freqs`, `density_bias`.
pub struct DensityKernel;

impl Kernel for DensityKernel {
    fn label(&self) -> &str {
        "occupancy_density"
    }

    fn link<'a>(&'a self, inputs: &'a KernelInputs) -> Result<KernelFn<'a>> {
        let g = inputs.get_usize("G")?;
        let q = inputs.get_usize("Q")?;
        let volumes = inputs.get_textures_3d("volumes")?;
        let weights = inputs.get_mat4s("density_weights")?;
        let freqs = inputs.get_floats("freqs")?;
        let bias = inputs.get_float("density_bias")?;
        if volumes.len() != freqs.len() * 2 || weights.len() != volumes.len() * 4 {
            return Err(Error::device(format!(
                "{} volumes, {} frequencies and {} weight blocks do not match",
                volumes.len(),
                freqs.len(),
                weights.len()
            )));
        }
        let cells = g * g * g;

        Ok(Box::new(move |i| {
            let (level, cell) = (i / cells, i % cells);
            let p = level_to_scene(cell_center(cell, g), level);
            let feats = encode(volumes, freqs, q, p);
            let hidden = grouped_matmul(weights, &feats);
            Vec4::splat(activate_density(hidden[0].x, bias))
        }))
    }
}

/// Max-reduction from finer levels into coarser ones.
///
/// Inputs: `G` and `levels`, the raw densities of pass 1 in cascade order.
pub struct MaxReduceKernel;

impl Kernel for MaxReduceKernel {
    fn label(&self) -> &str {
        "occupancy_max_reduce"
    }

    fn link<'a>(&'a self, inputs: &'a KernelInputs) -> Result<KernelFn<'a>> {
        let g = inputs.get_usize("G")?;
        let levels = inputs.get_textures_3d("levels")?;
        let cells = g * g * g;

        Ok(Box::new(move |i| {
            let (level, cell) = (i / cells, i % cells);
            let center = cell_center(cell, g);
            let (x, y, z) = (cell % g, (cell / g) % g, cell / (g * g));
            let mut value = levels[level].fetch(x, y, z).x;

            let p = level_to_scene(center, level);
            for (finer, texture) in levels.iter().enumerate().take(level) {
                let local = scene_to_level(p, finer);
                if local.cmpge(Vec3::ZERO).all() && local.cmple(Vec3::ONE).all() {
                    value = value.max(texture.fetch_nearest(local).x);
                }
            }
            Vec4::splat(value)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_centers() {
        assert_eq!(cell_center(0, 4), Vec3::splat(0.125));
        assert_eq!(cell_center(63, 4), Vec3::splat(0.875));
        assert_eq!(cell_center(1 + 4 * 2, 4), Vec3::new(0.375, 0.625, 0.125));
    }

    #[test]
    fn test_level_mapping() {
        let p = Vec3::new(0.1, 0.5, 0.9);
        for level in 0..4 {
            let back = level_to_scene(scene_to_level(p, level), level);
            assert!((back - p).abs().max_element() < 1e-6);
        }
        // Level 1 spans [-0.5, 1.5] in scene units.
        assert_eq!(level_to_scene(Vec3::ZERO, 1), Vec3::splat(-0.5));
    }
}
