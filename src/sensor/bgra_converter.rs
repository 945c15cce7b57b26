//! Decoding of raw camera payloads into the BGRA layout the overlay works in.

use std::convert::TryFrom;

use anyhow::{Result, anyhow};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_bgra, yuyv422_to_bgra,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

/// Pixel layout of a raw camera payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Nv12,
    Yuyv,
    Mjpeg,
    RawRgb,
    RawBgr,
    Gray,
}

pub fn to_bgra(layout: PixelLayout, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let bgra = match layout {
        PixelLayout::Nv12 => nv12_to_bgra(data, width, height)?,
        PixelLayout::Yuyv => yuyv_to_bgra(data, width, height)?,
        PixelLayout::Mjpeg => mjpeg_to_bgra(data, width, height)?,
        // Channel order flips on the way in, so a BGR payload needs no swap.
        PixelLayout::RawRgb => rgb_like_to_bgra(data, width, height, true)?,
        PixelLayout::RawBgr => rgb_like_to_bgra(data, width, height, false)?,
        PixelLayout::Gray => gray_to_bgra(data, width, height)?,
    };
    Ok(bgra)
}

/// Swaps the red and blue channels of packed 4-byte pixels in place.
pub fn swap_red_blue(pixels: &mut [u8]) {
    pixels.par_chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
}

fn nv12_to_bgra(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;

    if data.len() < y_plane_len + uv_plane_len {
        return Err(anyhow!(
            "NV12 buffer too small: got {}, expected {}",
            data.len(),
            y_plane_len + uv_plane_len
        ));
    }

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    let mut bgra = vec![0u8; y_plane_len * 4];
    yuv_nv12_to_bgra(
        &image,
        &mut bgra,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 conversion failed: {err:?}"))?;

    Ok(bgra)
}

fn yuyv_to_bgra(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 2;
    if data.len() < expected_len {
        return Err(anyhow!(
            "YUYV buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut bgra = vec![0u8; (width as usize * height as usize) * 4];
    yuyv422_to_bgra(
        &packed,
        &mut bgra,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 conversion failed: {err:?}"))?;

    Ok(bgra)
}

fn mjpeg_to_bgra(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::BGRA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let bgra = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let expected_len = usize::try_from(width)
        .and_then(|w| usize::try_from(height).map(|h| w * h * 4))
        .map_err(|_| anyhow!("MJPEG dimensions do not fit usize"))?;
    if bgra.len() != expected_len {
        return Err(anyhow!(
            "MJPEG frame has {} bytes, stream expects {}",
            bgra.len(),
            expected_len
        ));
    }

    Ok(bgra)
}

fn rgb_like_to_bgra(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 3;
    if data.len() < expected_len {
        return Err(anyhow!(
            "RGB buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let mut bgra = vec![0u8; (width as usize * height as usize) * 4];
    bgra.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            if swap_rb {
                dst[0] = src[2];
                dst[1] = src[1];
                dst[2] = src[0];
            } else {
                dst[..3].copy_from_slice(src);
            }
            dst[3] = 255;
        });

    Ok(bgra)
}

fn gray_to_bgra(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize;
    if data.len() < expected_len {
        return Err(anyhow!(
            "GRAY buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let mut bgra = vec![0u8; expected_len * 4];
    bgra.par_chunks_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| {
            dst[..3].fill(value);
            dst[3] = 255;
        });

    Ok(bgra)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_payload_lands_in_bgra_order() {
        let rgb = [10u8, 20, 30, 40, 50, 60];
        let bgra = to_bgra(PixelLayout::RawRgb, &rgb, 2, 1).unwrap();
        assert_eq!(bgra, vec![30, 20, 10, 255, 60, 50, 40, 255]);
    }

    #[test]
    fn bgr_payload_is_copied_through() {
        let bgr = [1u8, 2, 3];
        let bgra = to_bgra(PixelLayout::RawBgr, &bgr, 1, 1).unwrap();
        assert_eq!(bgra, vec![1, 2, 3, 255]);
    }

    #[test]
    fn gray_expands_to_opaque_pixels() {
        let bgra = to_bgra(PixelLayout::Gray, &[7, 9], 2, 1).unwrap();
        assert_eq!(bgra, vec![7, 7, 7, 255, 9, 9, 9, 255]);
    }

    #[test]
    fn yuyv_red_lands_in_the_red_channel() {
        // Two pixels sharing one strongly red chroma sample.
        let yuyv = [81u8, 90, 81, 240];
        let bgra = to_bgra(PixelLayout::Yuyv, &yuyv, 2, 1).unwrap();
        for px in bgra.chunks_exact(4) {
            assert!(px[2] > 200 && px[0] < 60, "{px:?}");
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn mjpeg_decodes_in_bgra_order() {
        let (width, height) = (8u32, 8u32);
        let rgb = [220u8, 20, 20].repeat((width * height) as usize);
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 95)
            .encode(&rgb, width, height, image::ExtendedColorType::Rgb8)
            .unwrap();

        let bgra = to_bgra(PixelLayout::Mjpeg, &jpeg, width, height).unwrap();
        assert_eq!(bgra.len(), (width * height * 4) as usize);
        let px = &bgra[..4];
        assert!(px[2] > 180 && px[0] < 70, "{px:?}");
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(to_bgra(PixelLayout::RawRgb, &[0u8; 5], 2, 1).is_err());
        assert!(to_bgra(PixelLayout::Yuyv, &[0u8; 3], 2, 1).is_err());
        assert!(to_bgra(PixelLayout::Nv12, &[0u8; 4], 2, 2).is_err());
    }
}
