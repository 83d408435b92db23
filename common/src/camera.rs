//! Camera interface as seen by the detection loop.
//!
use std::fmt;

/// A single frame at the camera's native resolution, RGB8 row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Number of bytes a well-formed frame of these dimensions must hold.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Live camera handle. Once acquisition has succeeded, the current frame
/// can be read at any time.
pub trait CameraSource {
    fn grab(&mut self) -> Result<RawFrame, CaptureError>;
}

/// Errors on the camera side.
#[derive(Debug)]
pub enum CaptureError {
    /// Device could not be opened or started (includes permission denied).
    Access(String),
    /// Reading a frame from a started stream failed.
    Capture(String),
    /// The captured frame could not be decoded to RGB.
    Decode(String),
    /// Frame pixel buffer is inconsistent with its stated dimensions.
    BadFrame(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Access(msg) => write!(f, "cannot access camera: {}", msg),
            CaptureError::Capture(msg) => write!(f, "frame capture failed: {}", msg),
            CaptureError::Decode(msg) => write!(f, "frame decode failed: {}", msg),
            CaptureError::BadFrame(msg) => write!(f, "malformed frame: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
