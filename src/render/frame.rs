//! Framebuffer rendering and export.

use glam::Vec4;
use rayon::prelude::*;

use super::camera::Camera;
use super::marcher::VolumeRayMarcher;

/// Premultiplied RGBA float image, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Vec4>,
}

impl Frame {
    /// Transparent black frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width * height],
        }
    }

    /// March one ray per pixel, rows in parallel.
    #[tracing::instrument(skip_all, fields(width = width, height = height))]
    pub fn render(marcher: &VolumeRayMarcher<'_>, camera: &Camera, width: usize, height: usize) -> Self {
        let mut frame = Self::new(width, height);
        if width == 0 || height == 0 {
            return frame;
        }
        frame
            .pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.iter_mut().enumerate() {
                    *px = marcher.march(&camera.ray(x, y, width, height)).rgba();
                }
            });
        frame
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Vec4 {
        self.pixels[y * self.width + x]
    }

    /// Composite over a straight-alpha background color.
    pub fn over(&self, background: Vec4) -> Self {
        let bg = background.truncate().extend(1.0) * background.w;
        let pixels = self
            .pixels
            .par_iter()
            .map(|&px| px + bg * (1.0 - px.w))
            .collect();
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Average opacity over all pixels.
    pub fn coverage(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().map(|p| p.w).sum::<f32>() / self.pixels.len() as f32
    }

    /// 8-bit premultiplied RGBA, tightly packed.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let texels: Vec<[u8; 4]> = self
            .pixels
            .iter()
            .map(|p| {
                let c = (p.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
                [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
            })
            .collect();
        bytemuck::allocation::cast_vec(texels)
    }
}
