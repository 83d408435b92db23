//! Webcam acquisition for the detection loop.
pub mod sensors;

pub use sensors::RscamSource;
