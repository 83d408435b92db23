//! Continuous webcam object-detection loop.
//!
//! The [`controller::DetectLoop`] drives a repeating capture → detect →
//! publish cycle, gated on two one-shot readiness conditions (camera
//! acquired, model loaded) and stoppable through a cancellation token.
pub mod controller;
pub mod meter;
pub mod nn;
pub mod publish;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod surface;
pub mod utils;
