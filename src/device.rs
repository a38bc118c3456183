//! Device capability layer.
//!
//! A [`FrameDevice`] is the adapter's only view of the sensor: two
//! independently pollable streams, each of which may have failed to open and
//! each of which may have nothing to deliver on a given poll. Backends are
//! runtime-substitutable, so environments without hardware run against
//! [`NullDevice`] (or [`ReplayDevice`] for scripted playback) instead of a
//! compile-time stub.

use std::collections::VecDeque;

use thiserror::Error;

use crate::frame::{ImageSize, NativeColorFrame, NativeDepthFrame};

/// Errors a device backend can surface from a poll.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("failed to open device: {0}")]
    OpenFailed(String),

    #[error("failed to read frame: {0}")]
    ReadFailed(String),
}

/// A sensor session with two independently pollable frame streams.
///
/// Polls are non-blocking: `Ok(None)` means "nothing new this cycle", which
/// is a normal outcome, not an error. A returned frame is owned by the
/// caller and dropped once consumed; no handle survives the poll.
pub trait FrameDevice {
    /// Native resolution of the color stream, or `None` if the stream
    /// failed to open. Fixed for the lifetime of the session.
    fn color_stream(&self) -> Option<ImageSize>;

    /// Native resolution of the depth stream, or `None` if the stream
    /// failed to open. Fixed for the lifetime of the session.
    fn depth_stream(&self) -> Option<ImageSize>;

    /// Latest color frame, if one arrived since the last poll.
    fn try_latest_color(&mut self) -> Result<Option<NativeColorFrame>, DeviceError>;

    /// Latest depth frame, if one arrived since the last poll.
    fn try_latest_depth(&mut self) -> Result<Option<NativeDepthFrame>, DeviceError>;
}

/// Backend for environments without a physical sensor: both streams report
/// closed and every poll comes back empty.
#[derive(Debug, Default)]
pub struct NullDevice;

impl NullDevice {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDevice for NullDevice {
    fn color_stream(&self) -> Option<ImageSize> {
        None
    }

    fn depth_stream(&self) -> Option<ImageSize> {
        None
    }

    fn try_latest_color(&mut self) -> Result<Option<NativeColorFrame>, DeviceError> {
        Ok(None)
    }

    fn try_latest_depth(&mut self) -> Result<Option<NativeDepthFrame>, DeviceError> {
        Ok(None)
    }
}

/// Scripted backend: serves queued frames in order, one per poll, with
/// explicit gaps for polls where no frame arrives. Used by tests and by
/// offline replay of recorded sequences.
#[derive(Debug)]
pub struct ReplayDevice {
    color_native: Option<ImageSize>,
    depth_native: Option<ImageSize>,
    color: VecDeque<Option<NativeColorFrame>>,
    depth: VecDeque<Option<NativeDepthFrame>>,
}

impl ReplayDevice {
    /// Both streams open at the given native resolutions, queues empty.
    pub fn new(color_native: ImageSize, depth_native: ImageSize) -> Self {
        Self {
            color_native: Some(color_native),
            depth_native: Some(depth_native),
            color: VecDeque::new(),
            depth: VecDeque::new(),
        }
    }

    /// Mark the color stream as failed-to-open.
    pub fn without_color(mut self) -> Self {
        self.color_native = None;
        self.color.clear();
        self
    }

    /// Mark the depth stream as failed-to-open.
    pub fn without_depth(mut self) -> Self {
        self.depth_native = None;
        self.depth.clear();
        self
    }

    /// Queue a color frame for the next color poll.
    pub fn push_color(&mut self, frame: NativeColorFrame) {
        self.color.push_back(Some(frame));
    }

    /// Queue an empty color poll (frame dropped that cycle).
    pub fn push_color_gap(&mut self) {
        self.color.push_back(None);
    }

    /// Queue a depth frame for the next depth poll.
    pub fn push_depth(&mut self, frame: NativeDepthFrame) {
        self.depth.push_back(Some(frame));
    }

    /// Queue an empty depth poll.
    pub fn push_depth_gap(&mut self) {
        self.depth.push_back(None);
    }
}

impl FrameDevice for ReplayDevice {
    fn color_stream(&self) -> Option<ImageSize> {
        self.color_native
    }

    fn depth_stream(&self) -> Option<ImageSize> {
        self.depth_native
    }

    fn try_latest_color(&mut self) -> Result<Option<NativeColorFrame>, DeviceError> {
        if self.color_native.is_none() {
            return Ok(None);
        }
        // An exhausted queue behaves like a run of dropped frames.
        Ok(self.color.pop_front().flatten())
    }

    fn try_latest_depth(&mut self) -> Result<Option<NativeDepthFrame>, DeviceError> {
        if self.depth_native.is_none() {
            return Ok(None);
        }
        Ok(self.depth.pop_front().flatten())
    }
}
