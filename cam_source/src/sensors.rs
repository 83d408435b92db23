//! Sensors module.
//!
use common::{CameraSource, CaptureError, RawFrame};
use image::RgbImage;
use rscam::{Camera, Config, IntervalInfo, ResolutionInfo};

/// Capture format requested from the device. MJPG is the format most
/// webcams support at their full resolution; frames are decoded to RGB
/// before they leave this crate.
const CAPTURE_FORMAT: &[u8] = b"MJPG";

/// Live webcam on a Linux machine, opened via V4L2.
pub struct RscamSource {
    camera: Camera,
}

impl RscamSource {
    /// Open and start a video device.
    ///
    /// `resolution` and `frame_rate` fall back to the maximum the device
    /// supports for the capture format when not pinned by the caller.
    pub fn open(
        device_name: &str,
        resolution: Option<(u32, u32)>,
        frame_rate: Option<(u32, u32)>,
    ) -> Result<Self, CaptureError> {
        let mut camera =
            Camera::new(device_name).map_err(|e| CaptureError::Access(e.to_string()))?;

        log::info!("Using camera {}", device_name);

        let resolution = match resolution {
            Some(res) => res,
            None => {
                let info = camera
                    .resolutions(CAPTURE_FORMAT)
                    .map_err(|e| CaptureError::Access(e.to_string()))?;
                pick_max_resolution(&info)?
            }
        };

        let frame_rate = match frame_rate {
            Some(rate) => rate,
            None => {
                let info = camera
                    .intervals(CAPTURE_FORMAT, resolution)
                    .map_err(|e| CaptureError::Access(e.to_string()))?;
                pick_max_frame_rate(&info)?
            }
        };

        log::info!(
            "Starting stream at {}x{} ({}/{} fps)",
            resolution.0,
            resolution.1,
            frame_rate.1,
            frame_rate.0
        );

        camera
            .start(&Config {
                interval: frame_rate,
                resolution,
                format: CAPTURE_FORMAT,
                ..Default::default()
            })
            .map_err(|e| CaptureError::Access(e.to_string()))?;

        Ok(Self { camera })
    }
}

impl CameraSource for RscamSource {
    fn grab(&mut self) -> Result<RawFrame, CaptureError> {
        let frame = self
            .camera
            .capture()
            .map_err(|e| CaptureError::Capture(e.to_string()))?;

        let image: RgbImage = turbojpeg::decompress_image(&frame[..])
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let (width, height) = image.dimensions();
        Ok(RawFrame::new(width, height, image.into_raw()))
    }
}

/// Pick the maximum supported resolution in terms of number of pixels.
fn pick_max_resolution(info: &ResolutionInfo) -> Result<(u32, u32), CaptureError> {
    log::debug!("Found resolutions: {:?}", info);
    match info {
        ResolutionInfo::Discretes(resolutions) => resolutions
            .iter()
            .map(|res| (res, res.0 * res.1))
            .max_by(|a, b| a.1.cmp(&b.1))
            .map(|(res, _)| *res),
        ResolutionInfo::Stepwise { max, .. } => Some(*max),
    }
    .ok_or_else(|| CaptureError::Access("no supported resolution found".into()))
}

/// Pick the maximum supported frame rate for the chosen resolution.
///
/// Intervals are given as `(denominator, numerator)` pairs, so the real
/// frame rate is `numerator / denominator`.
fn pick_max_frame_rate(info: &IntervalInfo) -> Result<(u32, u32), CaptureError> {
    log::debug!("Found frame rates: {:?}", info);
    match info {
        IntervalInfo::Discretes(frame_rates) => frame_rates
            .iter()
            .map(|(denominator, numerator)| ((denominator, numerator), numerator / denominator))
            .max_by(|a, b| a.1.cmp(&b.1))
            .map(|((&d, &n), _)| (d, n)),
        IntervalInfo::Stepwise { max, .. } => Some(*max),
    }
    .ok_or_else(|| CaptureError::Access("no supported frame rate found".into()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn picks_resolution_with_most_pixels() {
        let info = ResolutionInfo::Discretes(vec![(640, 480), (1280, 720), (320, 240)]);
        assert_eq!(pick_max_resolution(&info).unwrap(), (1280, 720));
    }

    #[test]
    fn picks_stepwise_resolution_maximum() {
        let info = ResolutionInfo::Stepwise {
            min: (320, 240),
            max: (1920, 1080),
            step: (16, 9),
        };
        assert_eq!(pick_max_resolution(&info).unwrap(), (1920, 1080));
    }

    #[test]
    fn empty_resolution_list_is_an_error() {
        let info = ResolutionInfo::Discretes(vec![]);
        assert!(pick_max_resolution(&info).is_err());
    }

    #[test]
    fn picks_highest_frame_rate() {
        // (1, 30) is 30 fps, (1, 10) is 10 fps.
        let info = IntervalInfo::Discretes(vec![(1, 10), (1, 30), (1, 15)]);
        assert_eq!(pick_max_frame_rate(&info).unwrap(), (1, 30));
    }
}
