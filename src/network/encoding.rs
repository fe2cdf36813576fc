//! Periodic positional encoding through the feature volumes.

use std::f32::consts::{PI, TAU};

use glam::{Vec3, Vec4};
use smallvec::SmallVec;

use crate::compute::Texture3D;
use crate::util::wrap;

/// Sampled features, one `Vec4` per volume. Inline up to four frequencies.
pub type Features = SmallVec<[Vec4; 8]>;

/// Volume coordinates of the sine and cosine lookups for one frequency.
///
/// The phase is `freq * pi * (p - 0.5)` wrapped to `[0, 2pi)`, and the
/// trigonometric value is squeezed by `(Q-1)/Q` so lookups stay between the
/// first and last texel centers.
#[inline]
pub fn frequency_coords(freq: f32, n_quants: usize, p: Vec3) -> (Vec3, Vec3) {
    let f = freq * PI;
    let phase = f * (p - 0.5);
    let phase = Vec3::new(wrap(phase.x, TAU), wrap(phase.y, TAU), wrap(phase.z, TAU));
    let squeeze = (n_quants as f32 - 1.0) / n_quants as f32;
    let (s, c) = (
        Vec3::new(phase.x.sin(), phase.y.sin(), phase.z.sin()),
        Vec3::new(phase.x.cos(), phase.y.cos(), phase.z.cos()),
    );
    (s * squeeze / 2.0 + 0.5, c * squeeze / 2.0 + 0.5)
}

/// Sample every volume at `p` (scene coordinates).
pub fn encode(volumes: &[Texture3D], freqs: &[f32], n_quants: usize, p: Vec3) -> Features {
    let mut feats = Features::with_capacity(freqs.len() * 2);
    for (i, &freq) in freqs.iter().enumerate() {
        let (sp, cp) = frequency_coords(freq, n_quants, p);
        feats.push(volumes[2 * i].sample(sp));
        feats.push(volumes[2 * i + 1].sample(cp));
    }
    feats
}
