//! Native pixel encoding to RGBA8 conversion.
//!
//! Devices deliver color frames in whatever encoding their transport uses;
//! everything is converted to 4-channel 8-bit RGBA before resampling. A
//! buffer shorter than the declared native resolution requires, or a
//! compressed frame that decodes to different dimensions, is a conversion
//! failure: the caller treats it as a skipped frame.

use anyhow::{Result, anyhow};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::frame::{ImageSize, NativeColorFrame, PixelEncoding};

/// Convert one native color frame into a tightly-packed RGBA buffer at the
/// frame's native resolution.
pub fn to_rgba(frame: &NativeColorFrame) -> Result<Vec<u8>> {
    let ImageSize { width, height } = frame.size;
    if width == 0 || height == 0 {
        return Err(anyhow!("empty native frame: {width}x{height}"));
    }

    if let Some(expected) = frame.encoding.expected_len(frame.size) {
        if frame.data.len() < expected {
            return Err(anyhow!(
                "{:?} buffer too small for {width}x{height}: got {}, expected {expected}",
                frame.encoding,
                frame.data.len(),
            ));
        }
    }

    match frame.encoding {
        PixelEncoding::Rgba => Ok(frame.data[..frame.size.pixel_count() * 4].to_vec()),
        PixelEncoding::Rgb => rgb_like_to_rgba(&frame.data, width, height, false),
        PixelEncoding::Bgr => rgb_like_to_rgba(&frame.data, width, height, true),
        PixelEncoding::Gray => gray_to_rgba(&frame.data, width, height),
        PixelEncoding::Yuyv => yuyv_to_rgba(&frame.data, width, height),
        PixelEncoding::Nv12 => nv12_to_rgba(&frame.data, width, height),
        PixelEncoding::Mjpeg => mjpeg_to_rgba(&frame.data, frame.size),
    }
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;

    let y_plane = &data[..y_plane_len];
    let uv_plane = &data[y_plane_len..y_plane_len + uv_plane_len];
    let mut rgba = vec![0u8; y_plane_len * 4];

    let image = YuvBiPlanarImage {
        y_plane,
        y_stride: width,
        uv_plane,
        uv_stride: width,
        width,
        height,
    };

    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    let mut rgba = vec![0u8; pixels * 4];
    let packed = YuvPackedImage {
        yuy: &data[..pixels * 2],
        yuy_stride: width * 2,
        width,
        height,
    };

    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422→RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8], declared: ImageSize) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    // The decoded dimensions must agree with what the device declared,
    // otherwise the resampler's source indexing would be meaningless.
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decode produced no header info"))?;
    let decoded_w = usize::try_from(info.width)
        .map_err(|_| anyhow!("MJPEG width does not fit usize"))?;
    let decoded_h = usize::try_from(info.height)
        .map_err(|_| anyhow!("MJPEG height does not fit usize"))?;
    if decoded_w != declared.width as usize || decoded_h != declared.height as usize {
        return Err(anyhow!(
            "MJPEG frame is {decoded_w}x{decoded_h}, device declared {}x{}",
            declared.width,
            declared.height
        ));
    }
    let expected_len = declared.pixel_count() * 4;
    if rgba.len() < expected_len {
        return Err(anyhow!(
            "MJPEG decode produced too few bytes: got {}, expected {expected_len}",
            rgba.len()
        ));
    }

    Ok(rgba)
}

fn rgb_like_to_rgba(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data[..pixels * 3].par_chunks_exact(3))
        .for_each(|(dst, src)| {
            if swap_rb {
                dst[0] = src[2];
                dst[1] = src[1];
                dst[2] = src[0];
            } else {
                dst[0] = src[0];
                dst[1] = src[1];
                dst[2] = src[2];
            }
            dst[3] = 255;
        });

    Ok(rgba)
}

fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data[..pixels].par_iter().copied())
        .for_each(|(dst, value)| {
            dst[0] = value;
            dst[1] = value;
            dst[2] = value;
            dst[3] = 255;
        });

    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(size: ImageSize, encoding: PixelEncoding, data: Vec<u8>) -> NativeColorFrame {
        NativeColorFrame {
            size,
            encoding,
            data,
        }
    }

    #[test]
    fn rgb_expands_with_opaque_alpha() {
        let f = frame(
            ImageSize::new(2, 1),
            PixelEncoding::Rgb,
            vec![1, 2, 3, 4, 5, 6],
        );
        assert_eq!(to_rgba(&f).unwrap(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn bgr_swaps_red_and_blue() {
        let f = frame(ImageSize::new(1, 1), PixelEncoding::Bgr, vec![10, 20, 30]);
        assert_eq!(to_rgba(&f).unwrap(), vec![30, 20, 10, 255]);
    }

    #[test]
    fn gray_replicates_luminance() {
        let f = frame(ImageSize::new(2, 1), PixelEncoding::Gray, vec![7, 9]);
        assert_eq!(to_rgba(&f).unwrap(), vec![7, 7, 7, 255, 9, 9, 9, 255]);
    }

    #[test]
    fn rgba_passes_through() {
        let f = frame(
            ImageSize::new(1, 1),
            PixelEncoding::Rgba,
            vec![10, 20, 30, 40],
        );
        assert_eq!(to_rgba(&f).unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn short_buffer_is_a_conversion_failure() {
        let f = frame(ImageSize::new(4, 4), PixelEncoding::Rgb, vec![0; 10]);
        assert!(to_rgba(&f).is_err());

        let f = frame(ImageSize::new(4, 4), PixelEncoding::Nv12, vec![0; 8]);
        assert!(to_rgba(&f).is_err());
    }

    #[test]
    fn empty_frame_is_rejected() {
        let f = frame(ImageSize::new(0, 0), PixelEncoding::Rgba, vec![]);
        assert!(to_rgba(&f).is_err());
    }

    #[test]
    fn garbage_mjpeg_is_a_conversion_failure() {
        let f = frame(
            ImageSize::new(8, 8),
            PixelEncoding::Mjpeg,
            vec![0xde, 0xad, 0xbe, 0xef],
        );
        assert!(to_rgba(&f).is_err());
    }

    #[test]
    fn yuyv_converts_at_declared_size() {
        // Mid-gray YUYV (Y=128, U=V=128) should come out as a neutral gray.
        let f = frame(
            ImageSize::new(2, 2),
            PixelEncoding::Yuyv,
            vec![128; 2 * 2 * 2],
        );
        let rgba = to_rgba(&f).unwrap();
        assert_eq!(rgba.len(), 2 * 2 * 4);
        for px in rgba.chunks_exact(4) {
            assert_eq!(px[3], 255);
            assert_eq!(px[0], px[2]);
        }
    }
}
