//! Webcam-backed color device (feature `camera-nokhwa`).
//!
//! A plain UVC webcam has no depth sensor, so this backend opens the color
//! stream only and reports the depth stream closed; the engine then runs
//! color-only, which is the same degraded mode it uses when a depth sensor
//! is absent entirely.

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use crate::device::{DeviceError, FrameDevice};
use crate::frame::{ImageSize, NativeColorFrame, NativeDepthFrame, PixelEncoding};

// Prefer pixel formats that are widely supported on macOS (the built-in
// cameras often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        // Fall back to any format Nokhwa can decode, but prefer higher FPS to
        // avoid very low default rates some drivers reject.
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

fn encoding_for(format: FrameFormat) -> PixelEncoding {
    match format {
        FrameFormat::RAWRGB => PixelEncoding::Rgb,
        FrameFormat::RAWBGR => PixelEncoding::Bgr,
        FrameFormat::GRAY => PixelEncoding::Gray,
        FrameFormat::YUYV => PixelEncoding::Yuyv,
        FrameFormat::NV12 => PixelEncoding::Nv12,
        FrameFormat::MJPEG => PixelEncoding::Mjpeg,
    }
}

fn build_camera(index: CameraIndex) -> Result<Camera, DeviceError> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.to_string()),
            },
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(DeviceError::OpenFailed(last_err.unwrap_or_else(|| {
        "no supported stream format".to_string()
    })))
}

/// Color-only device backend over a local webcam.
pub struct WebcamDevice {
    camera: Camera,
    native: ImageSize,
}

impl WebcamDevice {
    /// Open the first camera the platform backend reports.
    pub fn open_default() -> Result<Self, DeviceError> {
        let cameras =
            query(ApiBackend::Auto).map_err(|err| DeviceError::NotFound(err.to_string()))?;
        let info = cameras
            .first()
            .ok_or_else(|| DeviceError::NotFound("no cameras detected".to_string()))?;
        Self::open(info.index().clone())
    }

    /// Open a specific camera by index.
    pub fn open(index: CameraIndex) -> Result<Self, DeviceError> {
        let camera = build_camera(index)?;
        let resolution = camera.resolution();
        Ok(Self {
            native: ImageSize::new(resolution.width_x, resolution.height_y),
            camera,
        })
    }
}

impl FrameDevice for WebcamDevice {
    fn color_stream(&self) -> Option<ImageSize> {
        Some(self.native)
    }

    fn depth_stream(&self) -> Option<ImageSize> {
        None
    }

    fn try_latest_color(&mut self) -> Result<Option<NativeColorFrame>, DeviceError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|err| DeviceError::ReadFailed(err.to_string()))?;
        let resolution = buffer.resolution();
        Ok(Some(NativeColorFrame {
            size: ImageSize::new(resolution.width_x, resolution.height_y),
            encoding: encoding_for(buffer.source_frame_format()),
            data: buffer.buffer().to_vec(),
        }))
    }

    fn try_latest_depth(&mut self) -> Result<Option<NativeDepthFrame>, DeviceError> {
        // No depth sensor on a webcam.
        Ok(None)
    }
}
