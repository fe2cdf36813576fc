//! Field header and factor buffer types.

use glam::Vec3;
use half::f16;

use crate::util::{Error, Result};

/// Wire encoding of the feature tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodingVariant {
    /// Three per-axis factor vectors, combined as a rank-R product sum.
    ThreeFactor,
    /// Three per-plane factor matrices stored as 2D textures.
    TwoFactor,
    /// The dense tensor itself.
    Dense,
}

impl EncodingVariant {
    /// Map the container's integer tag.
    pub fn from_tag(tag: usize) -> Result<Self> {
        match tag {
            1 => Ok(Self::ThreeFactor),
            2 => Ok(Self::TwoFactor),
            3 => Ok(Self::Dense),
            other => Err(Error::unsupported(format!("encoding variant {other}"))),
        }
    }

    pub fn tag(self) -> usize {
        match self {
            Self::ThreeFactor => 1,
            Self::TwoFactor => 2,
            Self::Dense => 3,
        }
    }
}

/// Row-major 3x4 camera-to-world matrix as stored in the asset.
pub type PoseMatrix = [[f32; 4]; 3];

/// Decoded header scalars. Immutable once decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedField {
    /// Key prefix of the buffer fields (`ppng` or `qff`).
    pub format_tag: String,
    /// Frequency count `F`.
    pub n_freqs: usize,
    /// Per-axis quantization resolution `Q`.
    pub n_quants: usize,
    /// Occupancy grid resolution `G`.
    pub grid_res: usize,
    /// Feature channels `C`.
    pub n_feats: usize,
    /// Factorization rank `R`.
    pub rank: usize,
    pub variant: EncodingVariant,
    pub render_step: f32,
    /// `F` frequency scalars (multiplied by pi at encode time).
    pub freqs: Vec<f32>,
    pub up: Option<Vec3>,
    pub initial_pose: Option<PoseMatrix>,
    pub n_density_layers: usize,
    pub n_color_layers: usize,
    pub density_bias: f32,
}

impl CompressedField {
    /// Number of feature volumes, a sine and a cosine per frequency.
    #[inline]
    pub fn volume_count(&self) -> usize {
        self.n_freqs * 2
    }

    /// Values in the dense tensor: `F*2 * Q^3 * C`.
    pub fn dense_len(&self) -> usize {
        self.volume_count() * self.n_quants.pow(3) * self.n_feats
    }

    /// Values in one per-axis factor buffer for the current variant.
    pub fn factor_len(&self) -> usize {
        let (f2, q, r, c) = (self.volume_count(), self.n_quants, self.rank, self.n_feats);
        match self.variant {
            EncodingVariant::ThreeFactor => f2 * q * r * c,
            EncodingVariant::TwoFactor => f2 * q * q * r * c,
            EncodingVariant::Dense => self.dense_len(),
        }
    }

    /// Density threshold below which a cell is treated as empty: the
    /// density whose alpha over one base step equals `target_opacity`.
    pub fn grid_threshold(&self, target_opacity: f32) -> f32 {
        -(1.0 - target_opacity).ln() / self.render_step
    }

    /// Check header consistency.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_freqs == 0 {
            return Err(Error::malformed("n_freqs must be at least 1"));
        }
        if self.freqs.len() != self.n_freqs {
            return Err(Error::malformed(format!(
                "freqs has {} entries, n_freqs is {}",
                self.freqs.len(),
                self.n_freqs
            )));
        }
        if self.n_quants == 0 || self.grid_res == 0 || self.rank == 0 {
            return Err(Error::malformed(format!(
                "zero extent: n_quants={} grid_res={} rank={}",
                self.n_quants, self.grid_res, self.rank
            )));
        }
        if self.n_feats != 4 {
            return Err(Error::unsupported(format!("{} feature channels", self.n_feats)));
        }
        // Sizes derived below use plain arithmetic once these pass.
        let (f, q, r, c) = (self.n_freqs, self.n_quants, self.rank, self.n_feats);
        checked_extent("dense tensor", &[f, 2, q, q, q, c])?;
        checked_extent("factor buffers", &[3, f, 2, q, q, r, c])?;
        checked_extent("occupancy grid", &[self.grid_res, self.grid_res, self.grid_res])?;
        if !self.render_step.is_finite() || self.render_step <= 0.0 {
            return Err(Error::malformed(format!(
                "render_step must be finite and positive, got {}",
                self.render_step
            )));
        }
        match self.n_density_layers {
            1 => {}
            0 => return Err(Error::malformed("no density layer")),
            n => return Err(Error::unsupported(format!("{n} density layers"))),
        }
        if !(1..=2).contains(&self.n_color_layers) {
            return Err(Error::unsupported(format!("{} color layers", self.n_color_layers)));
        }
        Ok(())
    }
}

/// Product of `dims`, or a malformed-container error on overflow.
pub(crate) fn checked_extent(what: &str, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| Error::malformed(format!("{what} size {dims:?} overflows")))
}

/// Raw half-float factor data, consumed once by reconstruction.
#[derive(Clone, Debug, PartialEq)]
pub enum FactorBuffers {
    /// Per-axis factor vectors.
    ThreeFactor { x: Vec<f16>, y: Vec<f16>, z: Vec<f16> },
    /// Per-plane factor textures, indexed by the axis they leave out.
    TwoFactor { x: Vec<f16>, y: Vec<f16>, z: Vec<f16> },
    Dense(Vec<f16>),
}

impl FactorBuffers {
    /// Split a concatenated buffer into the variant's parts.
    pub fn split(field: &CompressedField, buffer: Vec<f16>) -> Result<Self> {
        let chunk = field.factor_len();
        let parts = match field.variant {
            EncodingVariant::Dense => 1,
            _ => 3,
        };
        if buffer.len() != chunk * parts {
            return Err(Error::malformed(format!(
                "{}_buffer has {} halfs, variant {} with F={} Q={} R={} C={} needs {}",
                field.format_tag,
                buffer.len(),
                field.variant.tag(),
                field.n_freqs,
                field.n_quants,
                field.rank,
                field.n_feats,
                chunk * parts
            )));
        }

        if field.variant == EncodingVariant::Dense {
            return Ok(Self::Dense(buffer));
        }
        let mut buffer = buffer;
        let z = buffer.split_off(2 * chunk);
        let y = buffer.split_off(chunk);
        let x = buffer;
        Ok(match field.variant {
            EncodingVariant::ThreeFactor => Self::ThreeFactor { x, y, z },
            _ => Self::TwoFactor { x, y, z },
        })
    }

    pub fn variant(&self) -> EncodingVariant {
        match self {
            Self::ThreeFactor { .. } => EncodingVariant::ThreeFactor,
            Self::TwoFactor { .. } => EncodingVariant::TwoFactor,
            Self::Dense(_) => EncodingVariant::Dense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(variant: EncodingVariant) -> CompressedField {
        CompressedField {
            format_tag: "ppng".into(),
            n_freqs: 1,
            n_quants: 2,
            grid_res: 4,
            n_feats: 4,
            rank: 3,
            variant,
            render_step: 0.01,
            freqs: vec![1.0],
            up: None,
            initial_pose: None,
            n_density_layers: 1,
            n_color_layers: 2,
            density_bias: 0.0,
        }
    }

    #[test]
    fn test_factor_lengths() {
        assert_eq!(header(EncodingVariant::ThreeFactor).factor_len(), 2 * 2 * 3 * 4);
        assert_eq!(header(EncodingVariant::TwoFactor).factor_len(), 2 * 4 * 3 * 4);
        assert_eq!(header(EncodingVariant::Dense).factor_len(), 2 * 8 * 4);
    }

    #[test]
    fn test_split_three_factor() {
        let field = header(EncodingVariant::ThreeFactor);
        let n = field.factor_len();
        let buffer: Vec<f16> = (0..3 * n).map(|i| f16::from_f32(i as f32)).collect();
        match FactorBuffers::split(&field, buffer).unwrap() {
            FactorBuffers::ThreeFactor { x, y, z } => {
                assert_eq!(x[0].to_f32(), 0.0);
                assert_eq!(y[0].to_f32(), n as f32);
                assert_eq!(z[0].to_f32(), 2.0 * n as f32);
                assert_eq!(z.len(), n);
            }
            other => panic!("unexpected {:?}", other.variant()),
        }
    }

    #[test]
    fn test_split_rejects_bad_length() {
        let field = header(EncodingVariant::TwoFactor);
        let err = FactorBuffers::split(&field, vec![f16::ZERO; 5]).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer(_)));
    }

    #[test]
    fn test_validate_layers_and_channels() {
        let mut field = header(EncodingVariant::Dense);
        assert!(field.validate().is_ok());

        field.n_density_layers = 2;
        assert!(matches!(field.validate(), Err(Error::UnsupportedLayout(_))));

        field.n_density_layers = 1;
        field.n_feats = 3;
        assert!(matches!(field.validate(), Err(Error::UnsupportedLayout(_))));

        field.n_feats = 4;
        field.render_step = 0.0;
        assert!(matches!(field.validate(), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_sizes() {
        let mut field = header(EncodingVariant::Dense);
        field.n_quants = 1 << 22;
        assert!(matches!(field.validate(), Err(Error::MalformedContainer(_))));

        let mut field = header(EncodingVariant::ThreeFactor);
        field.rank = usize::MAX / 2;
        assert!(matches!(field.validate(), Err(Error::MalformedContainer(_))));

        let mut field = header(EncodingVariant::Dense);
        field.grid_res = 1 << 30;
        assert!(matches!(field.validate(), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn test_grid_threshold() {
        let field = header(EncodingVariant::Dense);
        let th = field.grid_threshold(0.01);
        let alpha = 1.0 - (-th * field.render_step).exp();
        assert!((alpha - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_variant() {
        assert!(matches!(EncodingVariant::from_tag(4), Err(Error::UnsupportedLayout(_))));
        assert_eq!(EncodingVariant::from_tag(2).unwrap(), EncodingVariant::TwoFactor);
    }
}
