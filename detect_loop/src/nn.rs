//! Pretrained object-detection model.
//!
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use common::{BoundingBox, Detection};
use image::RgbImage;
use itertools::izip;
use ndarray::s;
use smallvec::SmallVec;
use tract_onnx::prelude::*;

use crate::utils::fetch_file;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;
type NnOut = SmallVec<[Arc<Tensor>; 4]>;

const MODEL_FILENAME: &str = "ssd_mobilenet_v1_10.onnx";
const MODEL_URL: &str = "https://github.com/onnx/models/raw/main/validated/vision/\
                         object_detection_segmentation/ssd-mobilenetv1/model/ssd_mobilenet_v1_10.onnx";

const INPUT_WIDTH: u32 = 300;
const INPUT_HEIGHT: u32 = 300;

/// Detector invoked once per cycle on the offscreen surface.
pub trait DetectionModel {
    fn detect(&self, frame: &RgbImage) -> impl std::future::Future<Output = Result<Vec<Detection>>>;
}

/// SSD-MobileNet trained on COCO, run with tract.
pub struct SsdMobilenetModel {
    model: NnModel,
    min_confidence: f32,
    max_iou: f32,
}

impl SsdMobilenetModel {
    /// Load the pretrained model, fetching the weights into the user cache
    /// directory on first use.
    pub async fn load(min_confidence: f32, max_iou: f32) -> Result<Self> {
        let model_path = cached_model_path().await?;
        let model = tokio::task::spawn_blocking(move || build_plan(&model_path)).await??;
        log::info!("Initialized SSD-MobileNet model");

        Ok(Self {
            model,
            min_confidence,
            max_iou,
        })
    }

    /// Resize the frame to the network input and lay it out as NHWC u8.
    fn preproc(&self, input: &RgbImage) -> Tensor {
        let resized: RgbImage = image::imageops::resize(
            input,
            INPUT_WIDTH,
            INPUT_HEIGHT,
            image::imageops::FilterType::Triangle,
        );

        tract_ndarray::Array4::from_shape_fn(
            (1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, 3),
            |(_, y, x, c)| resized[(x as u32, y as u32)][c],
        )
        .into()
    }
}

impl DetectionModel for SsdMobilenetModel {
    async fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let valid_input = tvec!(self.preproc(frame));
        let raw_nn_out = self.model.run(valid_input)?;
        decode_detections(&raw_nn_out, self.min_confidence, self.max_iou)
    }
}

/// Where the model weights live, downloading them if missing.
async fn cached_model_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("no cache directory on this system"))?
        .join("detect_loop");
    let model_path = cache_dir.join(MODEL_FILENAME);

    if !model_path.exists() {
        fetch_file(&reqwest::Client::new(), MODEL_URL, &model_path)
            .await
            .context("failed to fetch model weights")?;
    }

    Ok(model_path)
}

fn build_plan(path: &Path) -> Result<NnModel> {
    let input_fact = InferenceFact::dt_shape(
        u8::datum_type(),
        tvec!(1, INPUT_HEIGHT as i32, INPUT_WIDTH as i32, 3),
    );
    let model = tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, input_fact)?
        .into_optimized()?
        .into_runnable()?;

    Ok(model)
}

/// Turn the raw network output into labeled detections.
///
/// Output tensors are `boxes [1, N, 4]` with normalized
/// `[y_min, x_min, y_max, x_max]` corners, `classes [1, N]` with 1-based
/// COCO ids and `scores [1, N]`. Candidates below `min_confidence` or
/// without a known label are dropped, the rest go through non-maximum
/// suppression.
pub fn decode_detections(raw_nn_out: &NnOut, min_confidence: f32, max_iou: f32) -> Result<Vec<Detection>> {
    if raw_nn_out.len() < 3 {
        bail!("model returned {} outputs, expected at least 3", raw_nn_out.len());
    }

    let boxes = raw_nn_out[0].to_array_view::<f32>()?;
    let classes = raw_nn_out[1].to_array_view::<f32>()?;
    let scores = raw_nn_out[2].to_array_view::<f32>()?;

    let scores_row = scores.slice(s![0, ..]);
    let classes_row = classes.slice(s![0, ..]);
    let boxes_rows = boxes.slice(s![0, .., ..]);

    let mut candidates: Vec<(f32, &'static str, BoundingBox)> = izip!(
        scores_row.iter(),
        classes_row.iter(),
        boxes_rows.outer_iter(),
    )
    .filter_map(|(&score, &class, bbox)| {
        if score < min_confidence {
            return None;
        }
        let label = class_label(class as usize)?;
        let bbox = BoundingBox::new(bbox[1usize], bbox[0usize], bbox[3usize], bbox[2usize]);
        Some((score, label, bbox))
    })
    .collect();

    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    Ok(non_maximum_suppression(candidates, max_iou))
}

/// Run non-maximum-suppression on candidate detections.
///
/// Start with the most confident candidate and iterate over the rest in
/// the order of sinking confidence. Grow the vector of selected detections
/// by adding only those candidates which do not exceed `max_iou` with an
/// already selected bounding box.
fn non_maximum_suppression(
    mut sorted_candidates: Vec<(f32, &'static str, BoundingBox)>,
    max_iou: f32,
) -> Vec<Detection> {
    let mut selected: Vec<Detection> = vec![];
    'candidates: loop {
        // Pop the next most confident candidate from the back of the
        // ascending-sorted vector.
        match sorted_candidates.pop() {
            Some((confidence, label, bbox)) => {
                for kept in selected.iter() {
                    match bbox.iou(&kept.bbox) {
                        x if x > max_iou => continue 'candidates,
                        _ => (),
                    }
                }

                selected.push(Detection::new(label, confidence, bbox));
            }
            None => break 'candidates,
        }
    }

    selected
}

/// Look up the label for a 1-based COCO class id.
///
/// The map has gaps for classes removed from the released dataset; those
/// and id 0 (background) yield `None`.
pub fn class_label(class_id: usize) -> Option<&'static str> {
    COCO_LABELS.get(class_id).copied().flatten()
}

#[rustfmt::skip]
const COCO_LABELS: [Option<&str>; 91] = [
    None,
    Some("person"), Some("bicycle"), Some("car"), Some("motorcycle"),
    Some("airplane"), Some("bus"), Some("train"), Some("truck"), Some("boat"),
    Some("traffic light"), Some("fire hydrant"), None, Some("stop sign"),
    Some("parking meter"), Some("bench"), Some("bird"), Some("cat"),
    Some("dog"), Some("horse"), Some("sheep"), Some("cow"), Some("elephant"),
    Some("bear"), Some("zebra"), Some("giraffe"), None, Some("backpack"),
    Some("umbrella"), None, None, Some("handbag"), Some("tie"),
    Some("suitcase"), Some("frisbee"), Some("skis"), Some("snowboard"),
    Some("sports ball"), Some("kite"), Some("baseball bat"),
    Some("baseball glove"), Some("skateboard"), Some("surfboard"),
    Some("tennis racket"), Some("bottle"), None, Some("wine glass"),
    Some("cup"), Some("fork"), Some("knife"), Some("spoon"), Some("bowl"),
    Some("banana"), Some("apple"), Some("sandwich"), Some("orange"),
    Some("broccoli"), Some("carrot"), Some("hot dog"), Some("pizza"),
    Some("donut"), Some("cake"), Some("chair"), Some("couch"),
    Some("potted plant"), Some("bed"), None, Some("dining table"), None, None,
    Some("toilet"), None, Some("tv"), Some("laptop"), Some("mouse"),
    Some("remote"), Some("keyboard"), Some("cell phone"), Some("microwave"),
    Some("oven"), Some("toaster"), Some("sink"), Some("refrigerator"), None,
    Some("book"), Some("clock"), Some("vase"), Some("scissors"),
    Some("teddy bear"), Some("hair drier"), Some("toothbrush"),
];

#[cfg(test)]
mod test {
    use smallvec::smallvec;

    use super::*;

    #[test]
    fn label_map_covers_known_ids() {
        assert_eq!(class_label(1), Some("person"));
        assert_eq!(class_label(18), Some("dog"));
        assert_eq!(class_label(90), Some("toothbrush"));
    }

    #[test]
    fn label_map_gaps_and_background_are_none() {
        assert_eq!(class_label(0), None);
        assert_eq!(class_label(12), None);
        assert_eq!(class_label(83), None);
        assert_eq!(class_label(91), None);
    }

    #[test]
    fn nms_suppresses_overlapping_candidates() {
        let candidates = vec![
            (0.75, "dog", BoundingBox::new(0.6, 0.6, 0.9, 0.9)),
            (0.8, "person", BoundingBox::new(0.12, 0.12, 0.52, 0.52)),
            (0.9, "person", BoundingBox::new(0.1, 0.1, 0.5, 0.5)),
        ];

        let selected = non_maximum_suppression(candidates, 0.5);
        let labels: Vec<&str> = selected.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["person", "dog"]);
        assert!((selected[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn nms_keeps_disjoint_candidates() {
        let candidates = vec![
            (0.6, "cup", BoundingBox::new(0.0, 0.0, 0.1, 0.1)),
            (0.7, "bottle", BoundingBox::new(0.5, 0.5, 0.6, 0.6)),
        ];

        let selected = non_maximum_suppression(candidates, 0.5);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn decode_filters_scores_and_unknown_classes() -> Result<()> {
        let boxes: Tensor = tract_ndarray::arr3(&[[
            [0.1f32, 0.1, 0.5, 0.5],
            [0.12, 0.12, 0.52, 0.52],
            [0.6, 0.6, 0.9, 0.9],
            [0.2, 0.2, 0.4, 0.4],
            [0.7, 0.1, 0.8, 0.2],
        ]])
        .into();
        // Classes: person, person, dog, gap id, person.
        let classes: Tensor = tract_ndarray::arr2(&[[1.0f32, 1.0, 18.0, 12.0, 1.0]]).into();
        // Last two candidates fall to the unknown-label and score filters.
        let scores: Tensor = tract_ndarray::arr2(&[[0.9f32, 0.8, 0.75, 0.9, 0.2]]).into();
        let raw: NnOut = smallvec![Arc::new(boxes), Arc::new(classes), Arc::new(scores)];

        let detections = decode_detections(&raw, 0.5, 0.5)?;

        let labels: Vec<&str> = detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["person", "dog"]);
        // Box corners are reordered from [y_min, x_min, y_max, x_max].
        assert_eq!(detections[0].bbox, BoundingBox::new(0.1, 0.1, 0.5, 0.5));
        Ok(())
    }

    #[test]
    fn decode_rejects_truncated_output() {
        let scores: Tensor = tract_ndarray::arr2(&[[0.9f32]]).into();
        let raw: NnOut = smallvec![Arc::new(scores)];
        assert!(decode_detections(&raw, 0.5, 0.5).is_err());
    }
}
