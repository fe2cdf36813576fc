//! Dense feature volumes.

use std::sync::Arc;

use half::f16;

use crate::compute::Texture3D;
use crate::util::{Error, Result};

/// `F*2` volumes of `Q x Q x Q` texels with `C` channels.
///
/// Volume `2i` holds the sine features of frequency `i`, volume `2i + 1` the
/// cosine features. Cloning shares the volumes.
#[derive(Clone, Debug)]
pub struct DenseFeatureGrid {
    volumes: Arc<[Texture3D]>,
    n_freqs: usize,
    n_quants: usize,
    n_feats: usize,
}

impl DenseFeatureGrid {
    /// Split a flat `F*2 * Q^3 * C` tensor (x fastest, then y, z, volume).
    pub fn from_dense(n_freqs: usize, n_quants: usize, n_feats: usize, data: &[f16]) -> Result<Self> {
        let per_volume = n_quants.pow(3) * n_feats;
        let expected = n_freqs * 2 * per_volume;
        if data.len() != expected {
            return Err(Error::malformed(format!(
                "dense tensor has {} values, F={n_freqs} Q={n_quants} C={n_feats} needs {expected}",
                data.len()
            )));
        }
        let volumes = data
            .chunks_exact(per_volume.max(1))
            .map(|chunk| Texture3D::from_f16([n_quants; 3], n_feats, chunk))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            volumes: volumes.into(),
            n_freqs,
            n_quants,
            n_feats,
        })
    }

    #[inline]
    pub fn volumes(&self) -> &[Texture3D] {
        &self.volumes
    }

    /// Shared handle to the volumes, for binding as a kernel input.
    pub fn shared_volumes(&self) -> Arc<[Texture3D]> {
        Arc::clone(&self.volumes)
    }

    #[inline]
    pub fn n_freqs(&self) -> usize {
        self.n_freqs
    }

    #[inline]
    pub fn n_quants(&self) -> usize {
        self.n_quants
    }

    #[inline]
    pub fn n_feats(&self) -> usize {
        self.n_feats
    }

    /// Total stored values, `F*2 * Q^3 * C`.
    pub fn element_count(&self) -> usize {
        self.volumes.iter().map(|v| v.data().len()).sum()
    }
}
