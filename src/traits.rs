//! Core traits and types for camera-backed motion sensing.

use std::time::Duration;

/// Pixel format representation (e.g., YUYV, MJPG, RGB3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Video format specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride).
    pub stride: u32,
    /// Total frame size in bytes.
    pub size: u32,
}

impl Format {
    /// Create a new format specification.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        let stride = width * 2; // YUYV is 2 bytes per pixel
        let size = stride * height;
        Self {
            width,
            height,
            fourcc,
            stride,
            size,
        }
    }
}

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Metadata for a captured frame.
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Frame sequence number.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
    /// Actual bytes used in the frame buffer.
    pub bytes_used: u32,
}

/// A raw captured video frame, in the camera's native pixel format.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame data.
    pub data: Vec<u8>,
    /// Frame metadata.
    pub metadata: FrameMetadata,
}

/// A decoded RGBA raster of the camera feed at a point in time.
///
/// Four samples per pixel (R, G, B, A). One instance representing the
/// previous frame is retained between ticks for comparison; the current
/// instance becomes the new previous after each comparison.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Bytes per pixel in the decoded raster.
    pub const SAMPLES_PER_PIXEL: usize = 4;

    /// Wrap decoded RGBA data.
    ///
    /// Returns `None` if `data` does not hold exactly
    /// `width * height * 4` bytes.
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::SAMPLES_PER_PIXEL)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Raster width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether `other` has the same dimensions.
    #[must_use]
    pub const fn same_dimensions(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula, with values clamped to the
/// 0-255 range.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    // ITU-R BT.601 conversion
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    let clamp = |val: f32| -> u8 {
        if val < 0.0 {
            0
        } else if val > 255.0 {
            255
        } else {
            #[allow(clippy::cast_possible_truncation)]
            #[allow(clippy::cast_sign_loss)]
            {
                val as u8
            }
        }
    };

    (clamp(r), clamp(g), clamp(b))
}

/// Error type for camera operations.
#[derive(Debug)]
pub enum CameraError {
    /// Device with given index was not found.
    DeviceNotFound(u32),
    /// No capture-capable camera device was found on the system.
    NoDevice,
    /// Failed to open device.
    DeviceOpenFailed(String),
    /// Requested format is not supported.
    FormatNotSupported(Format),
    /// Acquisition was superseded before it completed. Benign: the
    /// lifecycle controller swallows this instead of surfacing it.
    Interrupted,
    /// Error during streaming operation.
    StreamError(String),
    /// I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for CameraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceNotFound(idx) => write!(f, "Device {idx} not found"),
            Self::NoDevice => write!(f, "No capture-capable camera found"),
            Self::DeviceOpenFailed(msg) => write!(f, "Failed to open device: {msg}"),
            Self::FormatNotSupported(fmt) => write!(f, "Format not supported: {fmt:?}"),
            Self::Interrupted => write!(f, "Camera acquisition interrupted"),
            Self::StreamError(msg) => write!(f, "Stream error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::Io(err)
        }
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Abstraction over camera acquisition.
///
/// The lifecycle controller asks the provider for a fresh session on every
/// enable; exactly one session exists at a time.
pub trait CameraProvider {
    /// The session type produced by `acquire`.
    type Session: CameraSession;

    /// Acquire a camera and start it streaming at (or near) the requested
    /// format. Each call opens a fresh session.
    fn acquire(&mut self, requested: &Format) -> Result<Self::Session>;
}

/// An open camera session: an acquired device together with its running
/// capture stream. Dropping the session releases both.
pub trait CameraSession {
    /// Get device capabilities.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Current reported format. Re-read by the sampler on every tick so a
    /// mid-session resolution change is picked up.
    fn format(&self) -> Result<Format>;

    /// Take the newest captured frame, if one is available.
    ///
    /// Returns `Ok(None)` when no new frame has arrived yet; this is a
    /// readiness gap, not an error.
    fn poll_frame(&mut self) -> Result<Option<Frame>>;
}
