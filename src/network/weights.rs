//! Fixed network weights.
//!
//! Every layer is a list of 4x4 blocks. A block is stored as 16 row-major
//! floats and maps one 4-wide input group to one 4-wide output group.

use glam::{Mat4, Vec4};

use crate::util::{Error, Result};

/// Floats per weight block.
pub const BLOCK_LEN: usize = 16;

/// Color head layouts.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorLayers {
    /// Hidden layer over the density features (16 blocks) or over density
    /// features plus the view encoding (32 blocks), ReLU, then 4 output blocks.
    TwoLayer { hidden: Vec<Mat4>, output: [Mat4; 4] },
    /// Density features (4 blocks) or features plus view encoding (8 blocks)
    /// straight to RGB.
    Direct(Vec<Mat4>),
}

impl ColorLayers {
    /// Whether the head consumes the view-direction encoding.
    pub fn is_view_dependent(&self) -> bool {
        match self {
            Self::TwoLayer { hidden, .. } => hidden.len() == 32,
            Self::Direct(blocks) => blocks.len() == 8,
        }
    }
}

/// Immutable density and color weights.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuralWeights {
    /// `F*2*4` blocks, indexed `feature * 4 + output group`.
    pub density: Vec<Mat4>,
    pub density_bias: f32,
    pub color: ColorLayers,
}

impl NeuralWeights {
    /// Build from raw little-endian-decoded layer floats.
    pub fn from_raw(n_freqs: usize, density: &[f32], color: &[Vec<f32>], density_bias: f32) -> Result<Self> {
        let density = blocks("density layer 0", density)?;
        let expected = n_freqs * 2 * 4;
        if density.len() != expected {
            return Err(Error::malformed(format!(
                "density layer has {} blocks, {n_freqs} frequencies need {expected}",
                density.len()
            )));
        }

        let color = match color {
            [hidden, output] => {
                let hidden = blocks("color layer 0", hidden)?;
                if hidden.len() != 16 && hidden.len() != 32 {
                    return Err(Error::unsupported(format!(
                        "color layer 0 with {} blocks",
                        hidden.len()
                    )));
                }
                let output = blocks("color layer 1", output)?;
                let output: [Mat4; 4] = output.as_slice().try_into().map_err(|_| {
                    Error::unsupported(format!("color layer 1 with {} blocks", output.len()))
                })?;
                ColorLayers::TwoLayer { hidden, output }
            }
            [direct] => {
                let direct = blocks("color layer 0", direct)?;
                if direct.len() != 4 && direct.len() != 8 {
                    return Err(Error::unsupported(format!(
                        "single color layer with {} blocks",
                        direct.len()
                    )));
                }
                ColorLayers::Direct(direct)
            }
            layers => {
                return Err(Error::unsupported(format!("{} color layers", layers.len())));
            }
        };

        Ok(Self {
            density,
            density_bias,
            color,
        })
    }

    /// Frequencies these weights were trained for.
    pub fn n_freqs(&self) -> usize {
        self.density.len() / 8
    }
}

/// Split a float buffer into row-major 4x4 blocks.
pub fn blocks(what: &str, raw: &[f32]) -> Result<Vec<Mat4>> {
    if raw.len() % BLOCK_LEN != 0 {
        return Err(Error::malformed(format!(
            "{what} has {} floats, not a multiple of {BLOCK_LEN}",
            raw.len()
        )));
    }
    Ok(raw
        .chunks_exact(BLOCK_LEN)
        .map(|c| Mat4::from_cols_slice(c).transpose())
        .collect())
}

/// `out[o] = sum_i w[i * 4 + o] * input[i]` over four output groups.
#[inline]
pub fn grouped_matmul(weights: &[Mat4], input: &[Vec4]) -> [Vec4; 4] {
    let mut out = [Vec4::ZERO; 4];
    for (i, x) in input.iter().enumerate() {
        for (o, acc) in out.iter_mut().enumerate() {
            *acc += weights[i * 4 + o] * *x;
        }
    }
    out
}
