//! Cascaded occupancy grid.
//!
//! Levels are stored in cascade order: level `i` spans a cube of half-width
//! `2^i` around the scene center relative to level 0, and the last level
//! spans the whole unit cube the renderer marches through. Lookups go by
//! *depth*, counted from that outermost level:
//!
//! ```text
//! depth 0 = level M-1  (|p - 0.5| <= 1/2)
//! depth 1 = level M-2  (|p - 0.5| <= 1/4)
//! ...
//! ```

use glam::Vec3;
use half::f16;

use crate::compute::Texture3D;
use crate::util::{Error, Result};

/// Finest depth whose region contains unit-cube point `p`, clamped to
/// `[0, mips - 1]`.
#[inline]
pub fn mip_from_pos(p: Vec3, mips: usize) -> usize {
    let extent = (p - 0.5).abs().max_element();
    // -log2(0) is +inf, which saturates to the innermost level.
    let depth = (-extent.log2()).floor() as i64 - 1;
    depth.clamp(0, mips.saturating_sub(1) as i64) as usize
}

/// Level-local texture coordinate of unit-cube point `p` at `depth`.
#[inline]
pub fn level_coord(p: Vec3, depth: usize) -> Vec3 {
    (p - 0.5) * (1u64 << depth) as f32 + 0.5
}

/// Mip levels of `G^3` density values.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    grid_res: usize,
    levels: Vec<Texture3D>,
    threshold: f32,
}

impl OccupancyGrid {
    /// Wrap `G^3` cells per level, cascade order.
    pub fn from_levels(grid_res: usize, levels: Vec<Vec<f16>>, threshold: f32) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::malformed("occupancy grid has no levels"));
        }
        if levels.len() > 31 {
            return Err(Error::unsupported(format!("{} occupancy levels", levels.len())));
        }
        let levels = levels
            .iter()
            .map(|cells| Texture3D::from_f16([grid_res; 3], 1, cells))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            grid_res,
            levels,
            threshold,
        })
    }

    #[inline]
    pub fn grid_res(&self) -> usize {
        self.grid_res
    }

    /// Number of levels `M`.
    #[inline]
    pub fn mips(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn levels(&self) -> &[Texture3D] {
        &self.levels
    }

    /// Density below which space is skipped.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Scene units per unit-cube unit, `2^(M-1)`.
    #[inline]
    pub fn aabb_scale(&self) -> f32 {
        (1u64 << (self.mips() - 1)) as f32
    }

    /// Cascade level for a lookup depth.
    #[inline]
    pub fn level_for_depth(&self, depth: usize) -> usize {
        self.mips() - 1 - depth.min(self.mips() - 1)
    }

    /// Depth used for unit-cube point `p`.
    #[inline]
    pub fn depth_at(&self, p: Vec3) -> usize {
        mip_from_pos(p, self.mips())
    }

    /// Trilinear grid value at unit-cube point `p`, from the finest level
    /// containing it.
    pub fn sample(&self, p: Vec3) -> f32 {
        let depth = self.depth_at(p);
        self.sample_depth(p, depth)
    }

    /// Trilinear grid value at `p` from a given depth.
    #[inline]
    pub fn sample_depth(&self, p: Vec3, depth: usize) -> f32 {
        let level = &self.levels[self.level_for_depth(depth)];
        level.sample(level_coord(p, depth)).x
    }

    pub fn is_occupied(&self, p: Vec3) -> bool {
        self.sample(p) >= self.threshold
    }

    /// Cells at or above the threshold, per level.
    pub fn occupied_cells(&self) -> Vec<usize> {
        self.levels
            .iter()
            .map(|l| l.data().iter().filter(|&&v| v >= self.threshold).count())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_boundaries_at_powers_of_two() {
        let at = |e: f32| mip_from_pos(Vec3::new(0.5 + e, 0.5, 0.5), 8);
        assert_eq!(at(0.5), 0);
        assert_eq!(at(0.3), 0);
        assert_eq!(at(0.25), 1);
        assert_eq!(at(0.2), 1);
        assert_eq!(at(0.125), 2);
        assert_eq!(at(0.0625), 3);
        assert_eq!(at(0.06), 3);
        // Center and outside the cube clamp.
        assert_eq!(mip_from_pos(Vec3::splat(0.5), 8), 7);
        assert_eq!(at(3.0), 0);
        assert_eq!(mip_from_pos(Vec3::splat(0.5), 3), 2);
        assert_eq!(at(0.01), 5);
    }

    #[test]
    fn test_level_coord_spans_region() {
        assert_eq!(level_coord(Vec3::splat(0.25), 1), Vec3::ZERO);
        assert_eq!(level_coord(Vec3::splat(0.75), 1), Vec3::ONE);
        assert_eq!(level_coord(Vec3::splat(0.3), 0), Vec3::splat(0.3));
    }

    #[test]
    fn test_sample_uses_inner_level_near_center() {
        let g = 2;
        let outer = vec![f16::from_f32(1.0); 8];
        let inner = vec![f16::from_f32(5.0); 8];
        // Cascade order: inner (level 0) first.
        let grid = OccupancyGrid::from_levels(g, vec![inner, outer], 3.0).unwrap();
        assert_eq!(grid.mips(), 2);
        assert_eq!(grid.aabb_scale(), 2.0);
        assert_eq!(grid.level_for_depth(0), 1);
        assert_eq!(grid.sample(Vec3::splat(0.5)), 5.0);
        assert_eq!(grid.sample(Vec3::new(0.9, 0.5, 0.5)), 1.0);
        assert!(grid.is_occupied(Vec3::splat(0.45)));
        assert!(!grid.is_occupied(Vec3::splat(0.05)));
        assert_eq!(grid.occupied_cells(), vec![8, 0]);
    }

    #[test]
    fn test_rejects_empty_and_bad_levels() {
        assert!(OccupancyGrid::from_levels(2, vec![], 1.0).is_err());
        assert!(matches!(
            OccupancyGrid::from_levels(2, vec![vec![f16::ZERO; 7]], 1.0),
            Err(Error::MalformedContainer(_))
        ));
    }
}
