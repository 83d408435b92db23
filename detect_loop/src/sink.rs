//! Presentation sink receiving the latest detection set.
//!
use std::io::Write;

use common::Detection;

use crate::state::SessionStatus;

/// Consumer of detection results and session status updates.
///
/// `publish` replaces whatever the sink showed before; there is no
/// incremental update and no history.
pub trait PresentationSink {
    fn publish(&mut self, detections: &[Detection]);
    fn on_status(&mut self, status: SessionStatus);
}

/// Render a detection as the one-line text form shown to the user.
pub fn format_detection(detection: &Detection) -> String {
    format!("{} - {:.2}", detection.label, detection.confidence)
}

/// Plain-text sink writing one line per detection.
///
/// Detections matching the watched label are additionally written to the
/// diagnostic log.
pub struct TextSink<W: Write> {
    out: W,
    watch_label: Option<String>,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, watch_label: Option<String>) -> Self {
        Self { out, watch_label }
    }
}

impl TextSink<std::io::Stdout> {
    pub fn stdout(watch_label: Option<String>) -> Self {
        Self::new(std::io::stdout(), watch_label)
    }
}

impl<W: Write> PresentationSink for TextSink<W> {
    fn publish(&mut self, detections: &[Detection]) {
        for detection in detections {
            if writeln!(self.out, "{}", format_detection(detection)).is_err() {
                log::warn!("presentation output closed");
                return;
            }

            if let Some(watched) = &self.watch_label {
                if &detection.label == watched {
                    log::info!(
                        "identified {}: confidence {:.3}, bbox {:?}",
                        detection.label,
                        detection.confidence,
                        detection.bbox
                    );
                }
            }
        }
    }

    fn on_status(&mut self, status: SessionStatus) {
        if writeln!(self.out, "[session {}]", status).is_err() {
            log::warn!("presentation output closed");
        }
    }
}
