mod minifb_surface;

use std::{mem, time::Duration};

use anyhow::{Context, Result};
use fast_image_resize as fir;

use crate::types::{BgraImage, Key};

pub use minifb_surface::MinifbSurface;

/// Where composited frames are shown and key presses come from.
pub trait DisplaySurface {
    /// Shows `image` in the surface named `title`.
    fn present(&mut self, title: &str, image: &BgraImage) -> Result<()>;
    /// Waits at most `timeout` for a key press.
    fn wait_key(&mut self, timeout: Duration) -> Option<Key>;
    fn close(&mut self);
}

/// Linear rescaling of frames before display, reusing its output buffer.
pub struct FrameScaler {
    scale: f32,
    resizer: fir::Resizer,
    output: BgraImage,
}

impl FrameScaler {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            resizer: fir::Resizer::new(),
            output: BgraImage::new(0, 0),
        }
    }

    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scaled = |v: u32| ((v as f32 * self.scale).round() as u32).max(1);
        (scaled(width), scaled(height))
    }

    pub fn scale(&mut self, src: &BgraImage) -> Result<&BgraImage> {
        let (dst_w, dst_h) = self.output_size(src.width, src.height);
        if (dst_w, dst_h) == (src.width, src.height) {
            self.output.clone_from(src);
            return Ok(&self.output);
        }

        let src_image =
            fir::images::ImageRef::new(src.width, src.height, &src.data, fir::PixelType::U8x4)
                .context("failed to wrap color image for scaling")?;

        let mut buffer = mem::take(&mut self.output.data);
        buffer.resize((dst_w as usize) * (dst_h as usize) * 4, 0);
        let mut dst_image =
            fir::images::Image::from_vec_u8(dst_w, dst_h, buffer, fir::PixelType::U8x4)
                .context("failed to create scaled image")?;

        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
        self.resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .context("fast resize failed")?;

        self.output = BgraImage {
            data: dst_image.into_vec(),
            width: dst_w,
            height: dst_h,
        };
        Ok(&self.output)
    }
}
