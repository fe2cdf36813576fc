//! Renderer settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compute::TileLayout;
use crate::util::Result;

/// Tunables shared by grid construction and ray marching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Opacity over one base step that counts as occupied.
    pub target_opacity: f32,
    /// Rays stop once transmittance falls below this.
    pub transmittance_cutoff: f32,
    /// Sample budget per ray, in base-step units.
    pub max_iterations: u32,
    /// Cap on the empty-space step multiplier.
    pub max_skip: usize,
    /// Added to the threshold for occupied run-length cells.
    pub occupancy_margin: f32,
    /// Multiplies `threshold + margin` for occupied run-length cells, so
    /// trilinear lookups stay above the threshold across the whole cell.
    pub occupancy_scale: f32,
    /// Levels built when an asset carries no run-length grid.
    pub derived_grid_mips: usize,
    pub tile_layout: TileLayout,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            target_opacity: 0.01,
            transmittance_cutoff: 0.01,
            max_iterations: 128,
            max_skip: 4,
            occupancy_margin: 1.0,
            occupancy_scale: 100.0,
            derived_grid_mips: 1,
            tile_layout: TileLayout::default(),
        }
    }
}

impl RenderSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Save settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
