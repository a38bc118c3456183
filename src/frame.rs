//! Frame buffer types shared between the device layer, the normalizers and
//! the reconstruction consumer.

/// Width/height of a pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Depth sensor validity constants (raw sensor units, millimeters).
///
/// Depth samples pass through unconverted; the consumer applies its own
/// unit conversion and should treat these markers accordingly.
pub const DEPTH_INVALID: u16 = 0;
/// Samples above this are out of the sensor's reliable range.
pub const DEPTH_MAX_VALID: u16 = 8000;

/// Pixel encodings a device may deliver for its color stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelEncoding {
    /// 4 bytes per pixel, already in the output channel order.
    Rgba,
    /// 3 bytes per pixel, R G B.
    Rgb,
    /// 3 bytes per pixel, B G R.
    Bgr,
    /// 1 byte per pixel luminance.
    Gray,
    /// Packed YUV 4:2:2, 2 bytes per pixel.
    Yuyv,
    /// Bi-planar YUV 4:2:0, 1.5 bytes per pixel.
    Nv12,
    /// JPEG-compressed; length varies per frame.
    Mjpeg,
}

impl PixelEncoding {
    /// Minimum byte length of a buffer holding `size` pixels in this
    /// encoding, or `None` for variable-length encodings.
    pub fn expected_len(&self, size: ImageSize) -> Option<usize> {
        let pixels = size.pixel_count();
        match self {
            PixelEncoding::Rgba => Some(pixels * 4),
            PixelEncoding::Rgb | PixelEncoding::Bgr => Some(pixels * 3),
            PixelEncoding::Gray => Some(pixels),
            PixelEncoding::Yuyv => Some(pixels * 2),
            PixelEncoding::Nv12 => Some(pixels + pixels / 2),
            PixelEncoding::Mjpeg => None,
        }
    }
}

/// Transient color frame handed back by one device poll. Carries its own
/// native dimensions, which need not match the engine's output resolution.
#[derive(Clone, Debug)]
pub struct NativeColorFrame {
    pub size: ImageSize,
    pub encoding: PixelEncoding,
    pub data: Vec<u8>,
}

/// Transient depth frame from one device poll, raw 16-bit sensor units.
#[derive(Clone, Debug)]
pub struct NativeDepthFrame {
    pub size: ImageSize,
    pub data: Vec<u16>,
}

/// Caller-owned RGBA8 output buffer, written in place on every delivered
/// frame and left untouched on skipped polls.
#[derive(Clone, Debug)]
pub struct ColorImage {
    size: ImageSize,
    data: Vec<u8>,
}

impl ColorImage {
    /// Zero-initialized buffer at the given resolution.
    pub fn new(size: ImageSize) -> Self {
        Self {
            size,
            data: vec![0; size.pixel_count() * 4],
        }
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// RGBA channels of the pixel at column `c`, row `r`.
    pub fn pixel(&self, c: u32, r: u32) -> [u8; 4] {
        let base = (r as usize * self.size.width as usize + c as usize) * 4;
        [
            self.data[base],
            self.data[base + 1],
            self.data[base + 2],
            self.data[base + 3],
        ]
    }
}

/// Caller-owned 16-bit depth output buffer, raw sensor units.
#[derive(Clone, Debug)]
pub struct DepthImage {
    size: ImageSize,
    data: Vec<u16>,
}

impl DepthImage {
    pub fn new(size: ImageSize) -> Self {
        Self {
            size,
            data: vec![0; size.pixel_count()],
        }
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    pub fn sample(&self, c: u32, r: u32) -> u16 {
        self.data[r as usize * self.size.width as usize + c as usize]
    }
}
