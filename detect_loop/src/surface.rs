//! Offscreen drawing surface used to snapshot camera frames.
//!
use common::{CaptureError, RawFrame};
use image::RgbImage;

/// Reusable in-memory pixel buffer the current frame is copied into before
/// it is handed to the model. Resized to the frame's native dimensions on
/// every blit; the buffer is only reallocated when the dimensions change.
pub struct FrameSurface {
    image: RgbImage,
}

impl FrameSurface {
    pub fn new() -> Self {
        Self {
            image: RgbImage::new(0, 0),
        }
    }

    /// Copy a frame into the surface.
    pub fn blit(&mut self, frame: &RawFrame) -> Result<(), CaptureError> {
        if frame.pixels.len() != frame.expected_len() {
            return Err(CaptureError::BadFrame(format!(
                "{}x{} frame carries {} bytes, expected {}",
                frame.width,
                frame.height,
                frame.pixels.len(),
                frame.expected_len()
            )));
        }

        if self.image.dimensions() != (frame.width, frame.height) {
            self.image = RgbImage::new(frame.width, frame.height);
        }
        self.image.copy_from_slice(&frame.pixels);

        Ok(())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl Default for FrameSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame(width: u32, height: u32, fill: u8) -> RawFrame {
        RawFrame::new(width, height, vec![fill; (width * height * 3) as usize])
    }

    #[test]
    fn surface_is_resized_to_native_frame_dimensions() {
        let mut surface = FrameSurface::new();
        surface.blit(&frame(640, 480, 1)).unwrap();
        assert_eq!(surface.dimensions(), (640, 480));
    }

    #[test]
    fn surface_follows_dimension_changes() {
        let mut surface = FrameSurface::new();
        surface.blit(&frame(640, 480, 1)).unwrap();
        surface.blit(&frame(1280, 720, 2)).unwrap();
        assert_eq!(surface.dimensions(), (1280, 720));
        assert_eq!(surface.image().get_pixel(0, 0).0, [2, 2, 2]);
    }

    #[test]
    fn pixels_are_copied_into_the_surface() {
        let mut surface = FrameSurface::new();
        surface.blit(&frame(2, 2, 9)).unwrap();
        assert!(surface.image().as_raw().iter().all(|&b| b == 9));
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let mut surface = FrameSurface::new();
        let bad = RawFrame::new(640, 480, vec![0; 10]);
        assert!(matches!(
            surface.blit(&bad),
            Err(CaptureError::BadFrame(_))
        ));
        // Surface keeps its previous (empty) dimensions.
        assert_eq!(surface.dimensions(), (0, 0));
    }
}
