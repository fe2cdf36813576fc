//! Factor product-sum kernels.
//!
//! Both kernels compute, for output texel `(x, y, z)` of volume `f`,
//!
//! ```text
//! sum_{r < R} X(f, .., r) * Y(f, .., r) * Z(f, .., r)
//! ```
//!
//! componentwise over the four channels, accumulating in `f32` in ascending
//! `r` order. They differ only in where each factor texel lives.

use glam::Vec4;

use crate::compute::{Kernel, KernelFn, KernelInputs};
use crate::util::Result;

/// Input names shared by both kernels.
pub const FACTOR_X: &str = "factors_x";
pub const FACTOR_Y: &str = "factors_y";
pub const FACTOR_Z: &str = "factors_z";

/// Split a flat output index into `(x, y, z, volume)`.
#[inline]
pub fn decompose(i: usize, q: usize) -> (usize, usize, usize, usize) {
    (i % q, (i / q) % q, (i / (q * q)) % q, i / (q * q * q))
}

/// Per-axis factor vectors, each a one-row texture of width `F*2*Q*R`.
/// Texel `f*Q*R + a*R + r` holds rank component `r` at coordinate `a`.
pub struct ThreeFactorKernel;

impl Kernel for ThreeFactorKernel {
    fn label(&self) -> &str {
        "three_factor"
    }

    fn link<'a>(&'a self, inputs: &'a KernelInputs) -> Result<KernelFn<'a>> {
        let q = inputs.get_usize("Q")?;
        let r = inputs.get_usize("R")?;
        let tx = inputs.get_texture_2d(FACTOR_X)?;
        let ty = inputs.get_texture_2d(FACTOR_Y)?;
        let tz = inputs.get_texture_2d(FACTOR_Z)?;

        Ok(Box::new(move |i| {
            let (x, y, z, f) = decompose(i, q);
            let base = f * q * r;
            let mut acc = Vec4::ZERO;
            for k in 0..r {
                let vx = tx.texel_fetch(base + x * r + k, 0);
                let vy = ty.texel_fetch(base + y * r + k, 0);
                let vz = tz.texel_fetch(base + z * r + k, 0);
                acc += vx * vy * vz;
            }
            acc
        }))
    }
}

/// Per-plane factor matrices, each a texture `Q*R` wide and `F*2*Q` high.
///
/// The X texture is indexed by `(y, z)`, Y by `(x, z)` and Z by `(x, y)`:
/// the column is `a*R + r` for the first axis and the row is `f*Q + b` for
/// the second.
pub struct TwoFactorKernel;

impl Kernel for TwoFactorKernel {
    fn label(&self) -> &str {
        "two_factor"
    }

    fn link<'a>(&'a self, inputs: &'a KernelInputs) -> Result<KernelFn<'a>> {
        let q = inputs.get_usize("Q")?;
        let r = inputs.get_usize("R")?;
        let tx = inputs.get_texture_2d(FACTOR_X)?;
        let ty = inputs.get_texture_2d(FACTOR_Y)?;
        let tz = inputs.get_texture_2d(FACTOR_Z)?;

        Ok(Box::new(move |i| {
            let (x, y, z, f) = decompose(i, q);
            let mut acc = Vec4::ZERO;
            for k in 0..r {
                let vx = tx.texel_fetch(y * r + k, f * q + z);
                let vy = ty.texel_fetch(x * r + k, f * q + z);
                let vz = tz.texel_fetch(x * r + k, f * q + y);
                acc += vx * vy * vz;
            }
            acc
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose() {
        assert_eq!(decompose(0, 4), (0, 0, 0, 0));
        assert_eq!(decompose(1 + 2 * 4 + 3 * 16 + 64, 4), (1, 2, 3, 1));
    }
}
