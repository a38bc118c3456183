//! Resolution normalization.
//!
//! The color stream is resampled from its native resolution to the fixed
//! output resolution by nearest-source-pixel area mapping: cheap and
//! deterministic, at the cost of aliasing. The depth stream's native
//! resolution equals the output resolution, so depth is a verbatim copy in
//! raw sensor units. If the depth resolutions ever diverge, extend
//! [`DepthNormalizer`] with the same mapping as [`ColorNormalizer`].

use anyhow::{Result, anyhow};
use rayon::prelude::*;

use crate::frame::{ColorImage, DepthImage, ImageSize, NativeDepthFrame};

/// Maps a native-resolution RGBA buffer into a fixed output resolution.
///
/// The per-axis scale factors are derived once from the declared native and
/// output resolutions, never hard-coded. For every output index `i` in
/// `0..n_out`, `floor(i * n_native / n_out) <= floor((n_out-1) * n_native /
/// n_out) < n_native`, so the source index is in range for any resolution
/// pairing.
#[derive(Clone, Copy, Debug)]
pub struct ColorNormalizer {
    native: ImageSize,
    output: ImageSize,
    col_scale: f64,
    row_scale: f64,
}

impl ColorNormalizer {
    pub fn new(native: ImageSize, output: ImageSize) -> Self {
        Self {
            native,
            output,
            col_scale: f64::from(native.width) / f64::from(output.width),
            row_scale: f64::from(native.height) / f64::from(output.height),
        }
    }

    pub fn native_size(&self) -> ImageSize {
        self.native
    }

    pub fn output_size(&self) -> ImageSize {
        self.output
    }

    /// Source row sampled for output row `r`.
    pub fn source_row(&self, r: u32) -> usize {
        (f64::from(r) * self.row_scale) as usize
    }

    /// Source column sampled for output column `c`.
    pub fn source_col(&self, c: u32) -> usize {
        (f64::from(c) * self.col_scale) as usize
    }

    /// Resample `rgba` (tightly packed, at the configured native resolution)
    /// into `out`. On any extent mismatch nothing is written.
    pub fn apply(&self, frame_size: ImageSize, rgba: &[u8], out: &mut ColorImage) -> Result<()> {
        if frame_size != self.native {
            return Err(anyhow!(
                "native frame is {}x{}, normalizer configured for {}x{}",
                frame_size.width,
                frame_size.height,
                self.native.width,
                self.native.height
            ));
        }
        if rgba.len() < self.native.pixel_count() * 4 {
            return Err(anyhow!(
                "RGBA buffer too small: got {}, expected {}",
                rgba.len(),
                self.native.pixel_count() * 4
            ));
        }
        if out.size() != self.output {
            return Err(anyhow!(
                "output buffer is {}x{}, normalizer configured for {}x{}",
                out.size().width,
                out.size().height,
                self.output.width,
                self.output.height
            ));
        }

        let out_width = self.output.width;
        let native_width = self.native.width as usize;
        let out_row_bytes = out_width as usize * 4;

        out.data_mut()
            .par_chunks_exact_mut(out_row_bytes)
            .enumerate()
            .for_each(|(r, out_row)| {
                let src_row_base = self.source_row(r as u32) * native_width * 4;
                for c in 0..out_width {
                    let src = src_row_base + self.source_col(c) * 4;
                    let dst = c as usize * 4;
                    out_row[dst..dst + 4].copy_from_slice(&rgba[src..src + 4]);
                }
            });

        Ok(())
    }
}

/// Copies raw 16-bit depth samples through unchanged.
#[derive(Clone, Copy, Debug)]
pub struct DepthNormalizer {
    output: ImageSize,
}

impl DepthNormalizer {
    pub fn new(output: ImageSize) -> Self {
        Self { output }
    }

    pub fn output_size(&self) -> ImageSize {
        self.output
    }

    /// Copy `frame` into `out` sample-for-sample. Native and output
    /// resolutions must match exactly; a mismatch writes nothing.
    pub fn apply(&self, frame: &NativeDepthFrame, out: &mut DepthImage) -> Result<()> {
        if frame.size != self.output || out.size() != self.output {
            return Err(anyhow!(
                "depth extent mismatch: frame {}x{}, output {}x{}, expected {}x{}",
                frame.size.width,
                frame.size.height,
                out.size().width,
                out.size().height,
                self.output.width,
                self.output.height
            ));
        }
        let n = self.output.pixel_count();
        if frame.data.len() < n {
            return Err(anyhow!(
                "depth buffer too small: got {}, expected {n}",
                frame.data.len()
            ));
        }

        out.data_mut().copy_from_slice(&frame.data[..n]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DEPTH_IMAGE_SIZE, NATIVE_COLOR_SIZE, RGB_IMAGE_SIZE};

    #[test]
    fn source_indices_stay_in_range_for_kinect_resolutions() {
        let n = ColorNormalizer::new(NATIVE_COLOR_SIZE, RGB_IMAGE_SIZE);
        for r in 0..RGB_IMAGE_SIZE.height {
            assert!(n.source_row(r) < NATIVE_COLOR_SIZE.height as usize);
        }
        for c in 0..RGB_IMAGE_SIZE.width {
            assert!(n.source_col(c) < NATIVE_COLOR_SIZE.width as usize);
        }
        // Extremes of the 1920x1080 -> 640x480 mapping.
        assert_eq!(n.source_row(479), 1077);
        assert_eq!(n.source_col(639), 1917);
    }

    #[test]
    fn scale_factors_are_derived_not_fixed() {
        let n = ColorNormalizer::new(ImageSize::new(100, 50), ImageSize::new(25, 25));
        assert_eq!(n.source_col(24), 96);
        assert_eq!(n.source_row(24), 48);
        // Upscaling also stays in range.
        let up = ColorNormalizer::new(ImageSize::new(10, 10), ImageSize::new(40, 40));
        for i in 0..40 {
            assert!(up.source_row(i) < 10);
            assert!(up.source_col(i) < 10);
        }
    }

    #[test]
    fn resample_picks_nearest_source_pixel() {
        // 4x2 native, 2x1 output: output (0,0) samples native (0,0),
        // output (1,0) samples native (2,0).
        let native = ImageSize::new(4, 2);
        let output = ImageSize::new(2, 1);
        let mut rgba = vec![0u8; native.pixel_count() * 4];
        for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&[i as u8, 0, 0, 255]);
        }

        let n = ColorNormalizer::new(native, output);
        let mut out = ColorImage::new(output);
        n.apply(native, &rgba, &mut out).unwrap();
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(out.pixel(1, 0), [2, 0, 0, 255]);
    }

    #[test]
    fn mismatched_extents_write_nothing() {
        let n = ColorNormalizer::new(NATIVE_COLOR_SIZE, RGB_IMAGE_SIZE);
        let mut out = ColorImage::new(RGB_IMAGE_SIZE);
        out.data_mut()[0] = 42;

        let wrong_size = ImageSize::new(1280, 720);
        let rgba = vec![0u8; wrong_size.pixel_count() * 4];
        assert!(n.apply(wrong_size, &rgba, &mut out).is_err());
        assert_eq!(out.data()[0], 42);

        let short = vec![0u8; 16];
        assert!(n.apply(NATIVE_COLOR_SIZE, &short, &mut out).is_err());
        assert_eq!(out.data()[0], 42);
    }

    #[test]
    fn depth_copies_raw_sensor_units() {
        let n = DepthNormalizer::new(DEPTH_IMAGE_SIZE);
        let frame = NativeDepthFrame {
            size: DEPTH_IMAGE_SIZE,
            data: vec![500; DEPTH_IMAGE_SIZE.pixel_count()],
        };
        let mut out = DepthImage::new(DEPTH_IMAGE_SIZE);
        n.apply(&frame, &mut out).unwrap();
        assert!(out.data().iter().all(|&d| d == 500));
    }

    #[test]
    fn depth_extent_mismatch_writes_nothing() {
        let n = DepthNormalizer::new(DEPTH_IMAGE_SIZE);
        let wrong = ImageSize::new(320, 240);
        let frame = NativeDepthFrame {
            size: wrong,
            data: vec![7; wrong.pixel_count()],
        };
        let mut out = DepthImage::new(DEPTH_IMAGE_SIZE);
        out.data_mut()[0] = 9;
        assert!(n.apply(&frame, &mut out).is_err());
        assert_eq!(out.data()[0], 9);
    }
}
