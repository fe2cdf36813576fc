//! Per-sample density and color evaluation.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use super::encoding::{encode, Features};
use super::sh::sh_basis;
use super::weights::{grouped_matmul, ColorLayers, NeuralWeights};
use crate::reconstruct::DenseFeatureGrid;
use crate::util::{sigmoid, Error, Result};

/// Upper bound on the density pre-activation before `exp`.
pub const MAX_LOG_DENSITY: f32 = 11.0;

/// `exp(min(pre + bias, MAX_LOG_DENSITY))`.
#[inline]
pub fn activate_density(pre: f32, bias: f32) -> f32 {
    (pre + bias).min(MAX_LOG_DENSITY).exp()
}

/// Network output at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample {
    pub density: f32,
    pub rgb: Vec3,
}

/// View-direction contribution to the color head, computed once per ray.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewConditioning([Vec4; 4]);

/// Fixed-weight evaluator over a dense feature grid.
#[derive(Clone, Debug)]
pub struct NeuralFieldEvaluator {
    grid: DenseFeatureGrid,
    weights: Arc<NeuralWeights>,
    freqs: Vec<f32>,
}

impl NeuralFieldEvaluator {
    pub fn new(grid: DenseFeatureGrid, weights: Arc<NeuralWeights>, freqs: Vec<f32>) -> Result<Self> {
        if freqs.len() != grid.n_freqs() {
            return Err(Error::malformed(format!(
                "{} frequencies for a grid of {} volumes",
                freqs.len(),
                grid.volumes().len()
            )));
        }
        if weights.n_freqs() != grid.n_freqs() {
            return Err(Error::malformed(format!(
                "density weights expect {} frequencies, grid has {}",
                weights.n_freqs(),
                grid.n_freqs()
            )));
        }
        Ok(Self { grid, weights, freqs })
    }

    #[inline]
    pub fn grid(&self) -> &DenseFeatureGrid {
        &self.grid
    }

    #[inline]
    pub fn weights(&self) -> &NeuralWeights {
        &self.weights
    }

    /// Encoding frequencies, before the factor of pi.
    #[inline]
    pub fn freqs(&self) -> &[f32] {
        &self.freqs
    }

    /// Feature lookups at `p`.
    pub fn features(&self, p: Vec3) -> Features {
        encode(self.grid.volumes(), &self.freqs, self.grid.n_quants(), p)
    }

    /// Density hidden vector: four groups of four.
    fn hidden(&self, feats: &[Vec4]) -> [Vec4; 4] {
        grouped_matmul(&self.weights.density, feats)
    }

    fn density_from_hidden(&self, hidden: &[Vec4; 4]) -> f32 {
        activate_density(hidden[0].x, self.weights.density_bias)
    }

    /// Density only, skipping the color head.
    pub fn density(&self, p: Vec3) -> f32 {
        let hidden = self.hidden(&self.features(p));
        self.density_from_hidden(&hidden)
    }

    /// Precompute the view-dependent part of the color head.
    pub fn view_conditioning(&self, dir: Vec3) -> ViewConditioning {
        if !self.weights.color.is_view_dependent() {
            return ViewConditioning::default();
        }
        let sh = sh_basis(dir);
        match &self.weights.color {
            ColorLayers::TwoLayer { hidden, .. } => ViewConditioning(grouped_matmul(&hidden[16..], &sh)),
            // Direct heads have a single output group.
            ColorLayers::Direct(blocks) => {
                let out = sh
                    .iter()
                    .zip(&blocks[4..])
                    .fold(Vec4::ZERO, |acc, (s, w)| acc + *w * *s);
                ViewConditioning([out, Vec4::ZERO, Vec4::ZERO, Vec4::ZERO])
            }
        }
    }

    /// Evaluate with a precomputed view term.
    pub fn evaluate_with(&self, p: Vec3, view: &ViewConditioning) -> FieldSample {
        let hidden = self.hidden(&self.features(p));
        let density = self.density_from_hidden(&hidden);

        let rgb = match &self.weights.color {
            ColorLayers::TwoLayer { hidden: w0, output } => {
                let layer0 = grouped_matmul(&w0[..16], &hidden);
                let mut out = Vec4::ZERO;
                for ((h, v), w) in layer0.iter().zip(&view.0).zip(output) {
                    out += *w * (*h + *v).max(Vec4::ZERO);
                }
                out
            }
            ColorLayers::Direct(w) => {
                let out = hidden.iter().zip(&w[..4]).fold(Vec4::ZERO, |acc, (h, w)| acc + *w * *h);
                out + view.0[0]
            }
        };

        FieldSample {
            density,
            rgb: sigmoid(rgb.truncate()),
        }
    }

    /// Evaluate density and color for one point and view direction.
    pub fn evaluate(&self, p: Vec3, dir: Vec3) -> FieldSample {
        self.evaluate_with(p, &self.view_conditioning(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use half::f16;

    fn constant_grid(value: f32) -> DenseFeatureGrid {
        let data = vec![f16::from_f32(value); 2 * 8 * 4];
        DenseFeatureGrid::from_dense(1, 2, 4, &data).unwrap()
    }

    fn zero_weights(bias: f32, color: Vec<Vec<f32>>) -> Arc<NeuralWeights> {
        Arc::new(NeuralWeights::from_raw(1, &vec![0.0; 8 * 16], &color, bias).unwrap())
    }

    #[test]
    fn test_zero_weights_give_bias_density_and_grey() {
        let weights = zero_weights(1.5, vec![vec![0.0; 32 * 16], vec![0.0; 4 * 16]]);
        let eval = NeuralFieldEvaluator::new(constant_grid(0.3), weights, vec![1.0]).unwrap();
        let s = eval.evaluate(Vec3::splat(0.4), Vec3::Z);
        assert!((s.density - 1.5f32.exp()).abs() < 1e-4);
        assert_eq!(s.rgb, Vec3::splat(0.5));
        assert_eq!(eval.density(Vec3::splat(0.9)), s.density);
    }

    #[test]
    fn test_density_is_capped() {
        let weights = zero_weights(40.0, vec![vec![0.0; 4 * 16]]);
        let eval = NeuralFieldEvaluator::new(constant_grid(0.0), weights, vec![1.0]).unwrap();
        assert_eq!(eval.density(Vec3::ZERO), MAX_LOG_DENSITY.exp());
    }

    #[test]
    fn test_density_reads_first_hidden_component() {
        let mut weights = NeuralWeights::from_raw(1, &vec![0.0; 8 * 16], &[vec![0.0; 4 * 16]], 0.0).unwrap();
        // Feature 0 (sine volume) into output group 0, identity.
        weights.density[0] = Mat4::IDENTITY;
        let eval = NeuralFieldEvaluator::new(constant_grid(0.5), Arc::new(weights), vec![2.0]).unwrap();
        assert!((eval.density(Vec3::splat(0.1)) - 0.5f32.exp()).abs() < 1e-5);
    }

    #[test]
    fn test_view_dependence() {
        let mut weights = NeuralWeights::from_raw(1, &vec![0.0; 8 * 16], &[vec![0.0; 8 * 16]], 0.0).unwrap();
        if let ColorLayers::Direct(blocks) = &mut weights.color {
            // SH group 0 -> rgb: red follows the constant term, green follows y.
            blocks[4] = Mat4::from_cols(Vec4::new(1.0, 0.0, 0.0, 0.0), Vec4::new(0.0, 1.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        }
        let eval = NeuralFieldEvaluator::new(constant_grid(0.0), Arc::new(weights), vec![1.0]).unwrap();
        let up = eval.evaluate(Vec3::splat(0.5), Vec3::Y);
        let down = eval.evaluate(Vec3::splat(0.5), Vec3::NEG_Y);
        assert_eq!(up.rgb.x, down.rgb.x);
        assert!(up.rgb.y < 0.5 && down.rgb.y > 0.5);
    }

    #[test]
    fn test_frequency_mismatch() {
        let weights = zero_weights(0.0, vec![vec![0.0; 4 * 16]]);
        let err = NeuralFieldEvaluator::new(constant_grid(0.0), weights, vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer(_)));
    }
}
