//! 1D logical index <-> 2D tile coordinate mapping.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Default maximum tile row width.
pub const TILE_MAX_WIDTH: usize = 16384;

/// Default maximum tile height.
pub const TILE_MAX_HEIGHT: usize = 16384;

/// Shape limits of the 2D surface a dispatch writes into.
///
/// Elements are laid out row-major: logical index `i` lives at
/// `(row = i / width, col = i % width)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    pub max_width: usize,
    pub max_height: usize,
}

impl TileLayout {
    pub const fn new(max_width: usize, max_height: usize) -> Self {
        Self { max_width, max_height }
    }

    /// Total number of addressable elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_width.saturating_mul(self.max_height)
    }

    /// Number of rows needed for `count` elements.
    #[inline]
    pub fn rows_for(&self, count: usize) -> usize {
        count.div_ceil(self.max_width)
    }

    /// Map a logical index to `(row, col)`.
    #[inline]
    pub fn coord(&self, index: usize) -> (usize, usize) {
        (index / self.max_width, index % self.max_width)
    }

    /// Map `(row, col)` back to the logical index.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.max_width + col
    }

    /// Validate a dispatch size and return the tile height to allocate.
    pub fn plan(&self, count: usize) -> Result<usize> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(Error::device("tile layout has a zero dimension"));
        }
        if count > self.capacity() {
            return Err(Error::CapacityExceeded {
                requested: count,
                capacity: self.capacity(),
            });
        }
        Ok(self.rows_for(count))
    }
}

impl Default for TileLayout {
    fn default() -> Self {
        Self::new(TILE_MAX_WIDTH, TILE_MAX_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_rows() {
        let layout = TileLayout::new(8, 4);
        assert_eq!(layout.plan(0).unwrap(), 0);
        assert_eq!(layout.plan(1).unwrap(), 1);
        assert_eq!(layout.plan(8).unwrap(), 1);
        assert_eq!(layout.plan(9).unwrap(), 2);
        assert_eq!(layout.plan(32).unwrap(), 4);
    }

    #[test]
    fn test_capacity_exceeded() {
        let layout = TileLayout::new(8, 4);
        let err = layout.plan(33).unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded { requested: 33, capacity: 32 }
        ));
    }

    #[test]
    fn test_mapping_is_bijection() {
        let layout = TileLayout::new(5, 7);
        for count in [1usize, 4, 5, 6, 17, 35] {
            let rows = layout.plan(count).unwrap();
            let mut seen = vec![false; count];
            for row in 0..rows {
                for col in 0..layout.max_width {
                    let i = layout.index(row, col);
                    if i < count {
                        assert!(!seen[i], "index {i} visited twice");
                        seen[i] = true;
                        assert_eq!(layout.coord(i), (row, col));
                    }
                }
            }
            assert!(seen.iter().all(|&s| s), "count {count} not covered");
        }
    }

    #[test]
    fn test_default_layout() {
        let layout = TileLayout::default();
        assert_eq!(layout.capacity(), 16384 * 16384);
        assert_eq!(layout.coord(16385), (1, 1));
    }
}
