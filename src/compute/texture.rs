//! Host-side texture storage with GPU sampling semantics.
//!
//! Data arrives as 16-bit floats and is widened to `f32` once at upload.
//! Layout is x-fastest: texel `(x, y, z)` lives at `(z * height + y) * width + x`.

use glam::{Vec3, Vec4};
use half::f16;

use crate::util::{Error, Result};

/// Four-channel 2D texture, read with nearest `texel_fetch`.
#[derive(Clone, Debug)]
pub struct Texture2D {
    width: usize,
    height: usize,
    texels: Vec<Vec4>,
}

impl Texture2D {
    /// Upload RGBA half-float data.
    pub fn from_f16(width: usize, height: usize, data: &[f16]) -> Result<Self> {
        let expected = width * height * 4;
        if data.len() != expected {
            return Err(Error::malformed(format!(
                "2D texture {width}x{height} needs {expected} halfs, got {}",
                data.len()
            )));
        }
        let texels = data
            .chunks_exact(4)
            .map(|c| Vec4::new(c[0].to_f32(), c[1].to_f32(), c[2].to_f32(), c[3].to_f32()))
            .collect();
        Ok(Self { width, height, texels })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Unfiltered read; out-of-range coordinates read as zero.
    #[inline]
    pub fn texel_fetch(&self, col: usize, row: usize) -> Vec4 {
        if col >= self.width || row >= self.height {
            return Vec4::ZERO;
        }
        self.texels[row * self.width + col]
    }
}

/// 3D texture with one or four channels and trilinear filtering.
#[derive(Clone, Debug)]
pub struct Texture3D {
    size: [usize; 3],
    channels: usize,
    data: Vec<f32>,
}

impl Texture3D {
    /// Upload half-float data with `channels` values per texel.
    pub fn from_f16(size: [usize; 3], channels: usize, data: &[f16]) -> Result<Self> {
        let data: Vec<f32> = data.iter().map(|v| v.to_f32()).collect();
        Self::from_f32(size, channels, data)
    }

    /// Wrap already widened data.
    pub fn from_f32(size: [usize; 3], channels: usize, data: Vec<f32>) -> Result<Self> {
        if channels != 1 && channels != 4 {
            return Err(Error::unsupported(format!("{channels}-channel 3D texture")));
        }
        if size.contains(&0) {
            return Err(Error::malformed(format!("3D texture has empty extent {size:?}")));
        }
        let expected = size[0] * size[1] * size[2] * channels;
        if data.len() != expected {
            return Err(Error::malformed(format!(
                "3D texture {size:?}x{channels} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { size, channels, data })
    }

    #[inline]
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw texel values, x-fastest.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Unfiltered read. Single-channel textures return `(r, 0, 0, 0)`.
    #[inline]
    pub fn fetch(&self, x: usize, y: usize, z: usize) -> Vec4 {
        let [w, h, _] = self.size;
        let base = ((z * h + y) * w + x) * self.channels;
        if self.channels == 4 {
            Vec4::from_slice(&self.data[base..base + 4])
        } else {
            Vec4::new(self.data[base], 0.0, 0.0, 0.0)
        }
    }

    /// Nearest texel containing a normalized coordinate.
    #[inline]
    pub fn fetch_nearest(&self, coord: Vec3) -> Vec4 {
        let idx = |c: f32, n: usize| ((c * n as f32).floor().max(0.0) as usize).min(n - 1);
        self.fetch(
            idx(coord.x, self.size[0]),
            idx(coord.y, self.size[1]),
            idx(coord.z, self.size[2]),
        )
    }

    /// Trilinear sample at a normalized coordinate, clamp-to-edge.
    pub fn sample(&self, coord: Vec3) -> Vec4 {
        let axis = |c: f32, n: usize| -> (usize, usize, f32) {
            let u = c * n as f32 - 0.5;
            let base = u.floor();
            let frac = u - base;
            let last = (n - 1) as isize;
            let i0 = (base as isize).clamp(0, last) as usize;
            let i1 = (base as isize + 1).clamp(0, last) as usize;
            (i0, i1, frac)
        };
        let (x0, x1, fx) = axis(coord.x, self.size[0]);
        let (y0, y1, fy) = axis(coord.y, self.size[1]);
        let (z0, z1, fz) = axis(coord.z, self.size[2]);

        let c00 = self.fetch(x0, y0, z0).lerp(self.fetch(x1, y0, z0), fx);
        let c10 = self.fetch(x0, y1, z0).lerp(self.fetch(x1, y1, z0), fx);
        let c01 = self.fetch(x0, y0, z1).lerp(self.fetch(x1, y0, z1), fx);
        let c11 = self.fetch(x0, y1, z1).lerp(self.fetch(x1, y1, z1), fx);
        let c0 = c00.lerp(c10, fy);
        let c1 = c01.lerp(c11, fy);
        c0.lerp(c1, fz)
    }
}
