//! Detection results produced by the model once per cycle.
//!
use serde::{Deserialize, Serialize};

/// Positive additive constant to avoid divide-by-zero.
const EPS: f32 = 1.0e-7;

/// One detected object: class label, confidence in `0.0..=1.0` and the
/// bounding region in normalized image coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Axis-aligned bounding box given by its top-left and bottom-right corners.
///
/// Coordinates are normalized to `0.0..=1.0` with the origin in the top-left
/// corner of the image.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Area enclosed by the box.
    ///
    /// An ill-defined box with its bottom-right corner above or to the left
    /// of the top-left corner has zero area.
    pub fn area(&self) -> f32 {
        let width = self.x_max - self.x_min;
        let height = self.y_max - self.y_min;
        if width < 0.0 || height < 0.0 {
            return 0.0;
        }

        width * height
    }

    /// Intersection-over-union of two boxes.
    ///
    /// If the boxes do not overlap, the corner points of the overlap box are
    /// ill-defined and its area is zero, so the metric is zero as well.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let overlap = BoundingBox::new(
            f32::max(self.x_min, other.x_min),
            f32::max(self.y_min, other.y_min),
            f32::min(self.x_max, other.x_max),
            f32::min(self.y_max, other.y_max),
        );

        let overlap_area = overlap.area();

        overlap_area / (self.area() + other.area() - overlap_area + EPS)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn area_of_well_defined_box() {
        let bbox = BoundingBox::new(0.1, 0.1, 0.5, 0.3);
        assert!((bbox.area() - 0.08).abs() < 1e-6);
    }

    #[test]
    fn area_of_ill_defined_box_is_zero() {
        let bbox = BoundingBox::new(0.5, 0.5, 0.1, 0.1);
        assert_eq!(bbox.area(), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let bbox = BoundingBox::new(0.2, 0.2, 0.6, 0.6);
        assert!((bbox.iou(&bbox) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BoundingBox::new(0.5, 0.5, 0.9, 0.9);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlapping_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BoundingBox::new(0.1, 0.0, 0.3, 0.2);
        // Intersection 0.02, union 0.06.
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-3);
    }
}
