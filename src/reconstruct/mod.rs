//! Dense feature tensor reconstruction.
//!
//! Rebuilds the `F*2` feature volumes from the wire encoding:
//!
//! | variant | buffers | per texel |
//! |---|---|---|
//! | three-factor | 3 vectors of `F*2*Q*R` texels | rank-R triple product |
//! | two-factor | 3 planes of `Q*R x F*2*Q` texels | rank-R triple product |
//! | dense | the tensor | passthrough |
//!
//! The factor variants run on the [`ComputeExecutor`] with half-float output.

mod grid;
mod kernels;

pub use grid::DenseFeatureGrid;
pub use kernels::{decompose, ThreeFactorKernel, TwoFactorKernel, FACTOR_X, FACTOR_Y, FACTOR_Z};

use half::f16;

use crate::compute::{ComputeExecutor, ElementType, Kernel, KernelInputs, Texture2D};
use crate::field::{CompressedField, FactorBuffers};
use crate::util::{Error, Result};

/// Turns factor buffers into a [`DenseFeatureGrid`].
pub struct TensorReconstructor<'a> {
    executor: &'a ComputeExecutor,
}

impl<'a> TensorReconstructor<'a> {
    pub fn new(executor: &'a ComputeExecutor) -> Self {
        Self { executor }
    }

    /// Reconstruct the dense grid described by `field`.
    #[tracing::instrument(skip_all, fields(variant = field.variant.tag(), f = field.n_freqs, q = field.n_quants, r = field.rank))]
    pub fn reconstruct(&self, field: &CompressedField, factors: FactorBuffers) -> Result<DenseFeatureGrid> {
        if factors.variant() != field.variant {
            return Err(Error::malformed(format!(
                "factor buffers are variant {}, header says {}",
                factors.variant().tag(),
                field.variant.tag()
            )));
        }
        if field.n_feats != 4 {
            return Err(Error::unsupported(format!("{} feature channels", field.n_feats)));
        }

        let (f2, q, r) = (field.volume_count(), field.n_quants, field.rank);
        let dense = match factors {
            FactorBuffers::Dense(data) => data,
            FactorBuffers::ThreeFactor { x, y, z } => {
                let width = f2 * q * r;
                let textures = [
                    Texture2D::from_f16(width, 1, &x)?,
                    Texture2D::from_f16(width, 1, &y)?,
                    Texture2D::from_f16(width, 1, &z)?,
                ];
                self.run(field, textures, &ThreeFactorKernel)?
            }
            FactorBuffers::TwoFactor { x, y, z } => {
                let (width, height) = (q * r, f2 * q);
                let textures = [
                    Texture2D::from_f16(width, height, &x)?,
                    Texture2D::from_f16(width, height, &y)?,
                    Texture2D::from_f16(width, height, &z)?,
                ];
                self.run(field, textures, &TwoFactorKernel)?
            }
        };

        let grid = DenseFeatureGrid::from_dense(field.n_freqs, q, field.n_feats, &dense)?;
        tracing::debug!(elements = grid.element_count(), "feature grid ready");
        Ok(grid)
    }

    fn run<K: Kernel>(&self, field: &CompressedField, textures: [Texture2D; 3], kernel: &K) -> Result<Vec<f16>> {
        let [x, y, z] = textures;
        let inputs = KernelInputs::new()
            .int("Q", field.n_quants)
            .int("R", field.rank)
            .int("F", field.n_freqs)
            .texture_2d(FACTOR_X, x)
            .texture_2d(FACTOR_Y, y)
            .texture_2d(FACTOR_Z, z);
        let count = field.volume_count() * field.n_quants.pow(3);
        let out = self.executor.execute(count, ElementType::Float16, 4, &inputs, kernel)?;
        out.into_f16()
            .ok_or_else(|| Error::device("reconstruction read back a non-half surface"))
    }
}
