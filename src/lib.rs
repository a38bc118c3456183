//! RGB-D frame acquisition and normalization for 3D reconstruction.
//!
//! Polls a depth camera's color and depth streams, converts whatever arrives
//! into one fixed pixel layout (RGBA8 color, raw u16 depth) at one fixed
//! resolution per stream, and writes the result into caller-owned buffers.
//! Dropped frames and missing sensors degrade silently; the consumer always
//! gets a pollable source.
//!
//! ## Example
//!
//! ```ignore
//! use rgbd_source::{ColorImage, DepthImage, ImageSource, SensorSource};
//!
//! let mut source = SensorSource::open("calib.txt");
//! let mut color = ColorImage::new(source.rgb_image_size());
//! let mut depth = DepthImage::new(source.depth_image_size());
//! while source.has_more_images() {
//!     source.get_images(&mut color, &mut depth);
//!     // feed color/depth to the reconstruction pipeline...
//! }
//! ```

pub mod convert;
pub mod device;
pub mod engine;
pub mod frame;
pub mod normalize;

#[cfg(feature = "camera-nokhwa")]
pub mod webcam;

pub use device::{DeviceError, FrameDevice, NullDevice, ReplayDevice};
pub use engine::{DEPTH_IMAGE_SIZE, ImageSource, NATIVE_COLOR_SIZE, RGB_IMAGE_SIZE, SensorSource};
pub use frame::{
    ColorImage, DEPTH_INVALID, DEPTH_MAX_VALID, DepthImage, ImageSize, NativeColorFrame,
    NativeDepthFrame, PixelEncoding,
};

#[cfg(feature = "camera-nokhwa")]
pub use webcam::WebcamDevice;
