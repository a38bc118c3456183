//! Frame source engine: owns the device session and hands synchronized-enough
//! frame pairs to the reconstruction consumer.
//!
//! The engine favors availability over correctness signaling: a missing
//! device, a dropped frame, or a failed conversion never surfaces as an error
//! from [`ImageSource::get_images`]. The consumer keeps receiving whatever is
//! newest, which may be the previous contents of its own buffers.

use std::path::{Path, PathBuf};

use crate::convert;
use crate::device::{FrameDevice, NullDevice};
use crate::frame::{ColorImage, DepthImage, ImageSize};
use crate::normalize::{ColorNormalizer, DepthNormalizer};

/// Fixed output resolution of the color stream.
pub const RGB_IMAGE_SIZE: ImageSize = ImageSize::new(640, 480);
/// Fixed output resolution of the depth stream (equals the sensor's native
/// depth resolution; depth is never resampled).
pub const DEPTH_IMAGE_SIZE: ImageSize = ImageSize::new(512, 424);
/// Native color resolution assumed when a backend cannot report one.
pub const NATIVE_COLOR_SIZE: ImageSize = ImageSize::new(1920, 1080);

/// What the reconstruction consumer sees: a stream of frame pairs at fixed
/// resolutions, plus the sizes it needs to pre-allocate its buffers.
pub trait ImageSource {
    /// Fetch the newest frames into the caller's buffers. Per stream: if the
    /// stream is unavailable or nothing arrived this poll, the buffer keeps
    /// its previous contents. Never blocks, never fails.
    fn get_images(&mut self, color: &mut ColorImage, depth: &mut DepthImage);

    /// Whether more frames may follow. A live sensor never signals
    /// end-of-stream; pacing is the caller's call frequency.
    fn has_more_images(&self) -> bool;

    /// Fixed color output resolution, valid before the first poll.
    fn rgb_image_size(&self) -> ImageSize;

    /// Fixed depth output resolution, valid before the first poll.
    fn depth_image_size(&self) -> ImageSize;
}

/// Engine over a runtime-substitutable [`FrameDevice`] backend.
///
/// Construction never fails: per-stream availability is fixed from the
/// backend's open state, and a fully degraded engine (no working streams)
/// is still a valid, pollable object. Device teardown happens exactly once
/// when the engine drops, whether or not any stream ever opened.
pub struct SensorSource {
    device: Box<dyn FrameDevice>,
    calib_path: PathBuf,
    color_available: bool,
    depth_available: bool,
    color_normalizer: ColorNormalizer,
    depth_normalizer: DepthNormalizer,
}

impl SensorSource {
    /// Wrap an already-constructed device backend. The calibration file is
    /// opaque here; its path is only carried for the calibration loader.
    pub fn new(calib_path: impl Into<PathBuf>, device: Box<dyn FrameDevice>) -> Self {
        let color_native = device.color_stream();
        let depth_native = device.depth_stream();

        let color_available = color_native.is_some();
        let depth_available = depth_native.is_some();
        if !color_available {
            log::error!("color stream unavailable, color output will not be written");
        }
        if !depth_available {
            log::error!("depth stream unavailable, depth output will not be written");
        }

        let color_normalizer =
            ColorNormalizer::new(color_native.unwrap_or(NATIVE_COLOR_SIZE), RGB_IMAGE_SIZE);
        if depth_native.is_some_and(|native| native != DEPTH_IMAGE_SIZE) {
            log::warn!("depth stream native resolution differs from output, frames will be skipped");
        }

        Self {
            device,
            calib_path: calib_path.into(),
            color_available,
            depth_available,
            color_normalizer,
            depth_normalizer: DepthNormalizer::new(DEPTH_IMAGE_SIZE),
        }
    }

    /// Open the default backend for this build: a webcam when the
    /// `camera-nokhwa` feature is enabled, otherwise the null device. Falls
    /// back to the null device on any open failure rather than failing.
    pub fn open(calib_path: impl Into<PathBuf>) -> Self {
        Self::new(calib_path, default_device())
    }

    /// Path of the (opaque) calibration file this source was built with.
    pub fn calibration_path(&self) -> &Path {
        &self.calib_path
    }

    pub fn color_available(&self) -> bool {
        self.color_available
    }

    pub fn depth_available(&self) -> bool {
        self.depth_available
    }

    fn poll_color(&mut self, out: &mut ColorImage) {
        match self.device.try_latest_color() {
            Ok(Some(native)) => match convert::to_rgba(&native) {
                Ok(rgba) => {
                    if let Err(err) = self.color_normalizer.apply(native.size, &rgba, out) {
                        log::warn!("color frame skipped: {err:#}");
                    }
                }
                Err(err) => log::warn!("color frame conversion failed: {err:#}"),
            },
            Ok(None) => log::debug!("no color frame this poll"),
            Err(err) => log::warn!("color frame read failed: {err}"),
        }
    }

    fn poll_depth(&mut self, out: &mut DepthImage) {
        match self.device.try_latest_depth() {
            Ok(Some(native)) => {
                if let Err(err) = self.depth_normalizer.apply(&native, out) {
                    log::warn!("depth frame skipped: {err:#}");
                }
            }
            Ok(None) => log::debug!("no depth frame this poll"),
            Err(err) => log::warn!("depth frame read failed: {err}"),
        }
    }
}

impl ImageSource for SensorSource {
    fn get_images(&mut self, color: &mut ColorImage, depth: &mut DepthImage) {
        if self.color_available {
            self.poll_color(color);
        }
        if self.depth_available {
            self.poll_depth(depth);
        }
    }

    fn has_more_images(&self) -> bool {
        true
    }

    fn rgb_image_size(&self) -> ImageSize {
        RGB_IMAGE_SIZE
    }

    fn depth_image_size(&self) -> ImageSize {
        DEPTH_IMAGE_SIZE
    }
}

#[cfg(feature = "camera-nokhwa")]
fn default_device() -> Box<dyn FrameDevice> {
    match crate::webcam::WebcamDevice::open_default() {
        Ok(dev) => Box::new(dev),
        Err(err) => {
            log::error!("failed to open webcam, running without sensors: {err}");
            Box::new(NullDevice::new())
        }
    }
}

#[cfg(not(feature = "camera-nokhwa"))]
fn default_device() -> Box<dyn FrameDevice> {
    Box::new(NullDevice::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ReplayDevice;
    use crate::frame::{NativeColorFrame, NativeDepthFrame, PixelEncoding};

    fn solid_color(size: ImageSize, px: [u8; 4]) -> NativeColorFrame {
        let mut data = Vec::with_capacity(size.pixel_count() * 4);
        for _ in 0..size.pixel_count() {
            data.extend_from_slice(&px);
        }
        NativeColorFrame {
            size,
            encoding: PixelEncoding::Rgba,
            data,
        }
    }

    fn solid_depth(size: ImageSize, value: u16) -> NativeDepthFrame {
        NativeDepthFrame {
            size,
            data: vec![value; size.pixel_count()],
        }
    }

    #[test]
    fn healthy_device_fills_both_outputs() {
        let mut dev = ReplayDevice::new(NATIVE_COLOR_SIZE, DEPTH_IMAGE_SIZE);
        dev.push_color(solid_color(NATIVE_COLOR_SIZE, [10, 20, 30, 255]));
        dev.push_depth(solid_depth(DEPTH_IMAGE_SIZE, 500));

        let mut source = SensorSource::new("calib.txt", Box::new(dev));
        assert!(source.color_available());
        assert!(source.depth_available());

        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);
        source.get_images(&mut color, &mut depth);

        assert!(
            color
                .data()
                .chunks_exact(4)
                .all(|px| px == [10, 20, 30, 255])
        );
        assert!(depth.data().iter().all(|&d| d == 500));
    }

    #[test]
    fn no_device_leaves_buffers_untouched_but_stays_live() {
        let mut source = SensorSource::new("calib.txt", Box::new(NullDevice::new()));
        assert!(!source.color_available());
        assert!(!source.depth_available());

        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);
        color.data_mut()[0] = 77;
        depth.data_mut()[0] = 88;

        source.get_images(&mut color, &mut depth);
        assert_eq!(color.data()[0], 77);
        assert_eq!(depth.data()[0], 88);
        assert!(source.has_more_images());
    }

    #[test]
    fn empty_polls_leave_buffers_byte_identical() {
        let mut dev = ReplayDevice::new(NATIVE_COLOR_SIZE, DEPTH_IMAGE_SIZE);
        dev.push_color_gap();
        dev.push_depth_gap();

        let mut source = SensorSource::new("calib.txt", Box::new(dev));
        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);
        color.data_mut().fill(123);
        depth.data_mut().fill(456);
        let color_before = color.data().to_vec();
        let depth_before = depth.data().to_vec();

        source.get_images(&mut color, &mut depth);
        assert_eq!(color.data(), color_before.as_slice());
        assert_eq!(depth.data(), depth_before.as_slice());
    }

    #[test]
    fn dropped_color_frame_keeps_previous_contents() {
        let mut dev = ReplayDevice::new(NATIVE_COLOR_SIZE, DEPTH_IMAGE_SIZE);
        dev.push_color(solid_color(NATIVE_COLOR_SIZE, [1, 2, 3, 255]));
        dev.push_color_gap();

        let mut source = SensorSource::new("calib.txt", Box::new(dev));
        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);

        source.get_images(&mut color, &mut depth);
        assert!(color.data().chunks_exact(4).all(|px| px == [1, 2, 3, 255]));

        source.get_images(&mut color, &mut depth);
        assert!(color.data().chunks_exact(4).all(|px| px == [1, 2, 3, 255]));
    }

    #[test]
    fn conversion_failure_is_treated_as_skipped() {
        let mut dev = ReplayDevice::new(NATIVE_COLOR_SIZE, DEPTH_IMAGE_SIZE);
        // Declared 1920x1080 but far too few bytes: conversion failure.
        dev.push_color(NativeColorFrame {
            size: NATIVE_COLOR_SIZE,
            encoding: PixelEncoding::Rgba,
            data: vec![9; 16],
        });

        let mut source = SensorSource::new("calib.txt", Box::new(dev));
        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);
        color.data_mut().fill(55);

        source.get_images(&mut color, &mut depth);
        assert!(color.data().iter().all(|&b| b == 55));
    }

    #[test]
    fn depth_frame_at_wrong_resolution_is_skipped() {
        let wrong = ImageSize::new(320, 240);
        let mut dev = ReplayDevice::new(NATIVE_COLOR_SIZE, DEPTH_IMAGE_SIZE);
        dev.push_depth(solid_depth(wrong, 42));

        let mut source = SensorSource::new("calib.txt", Box::new(dev));
        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);

        source.get_images(&mut color, &mut depth);
        assert!(depth.data().iter().all(|&d| d == 0));
    }

    #[test]
    fn sizes_are_constant_regardless_of_availability() {
        let live = SensorSource::new(
            "calib.txt",
            Box::new(ReplayDevice::new(NATIVE_COLOR_SIZE, DEPTH_IMAGE_SIZE)),
        );
        let dead = SensorSource::new("calib.txt", Box::new(NullDevice::new()));
        assert_eq!(live.rgb_image_size(), RGB_IMAGE_SIZE);
        assert_eq!(dead.rgb_image_size(), RGB_IMAGE_SIZE);
        assert_eq!(live.depth_image_size(), DEPTH_IMAGE_SIZE);
        assert_eq!(dead.depth_image_size(), DEPTH_IMAGE_SIZE);
        assert_eq!(dead.calibration_path(), Path::new("calib.txt"));
    }

    #[test]
    fn non_native_color_resolution_drives_derived_scales() {
        // A 1280x720 backend still fills the fixed 640x480 output.
        let native = ImageSize::new(1280, 720);
        let mut dev = ReplayDevice::new(native, DEPTH_IMAGE_SIZE);
        dev.push_color(solid_color(native, [4, 5, 6, 255]));

        let mut source = SensorSource::new("calib.txt", Box::new(dev));
        let mut color = ColorImage::new(RGB_IMAGE_SIZE);
        let mut depth = DepthImage::new(DEPTH_IMAGE_SIZE);
        source.get_images(&mut color, &mut depth);
        assert!(color.data().chunks_exact(4).all(|px| px == [4, 5, 6, 255]));
    }
}
