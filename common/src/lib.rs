//! Types shared between the detection loop and the camera side.
pub mod camera;
pub mod detection;

pub use camera::{CameraSource, CaptureError, RawFrame};
pub use detection::{BoundingBox, Detection};
