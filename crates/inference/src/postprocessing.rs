use crate::labels::{LabelMap, detector_class_name};
use crate::preprocessing::TransformParams;

/// Axis-aligned box in original-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// One detector output item.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: &'static str,
    pub confidence: f32,
}

/// Classifier output: argmax label plus the full probability vector,
/// index-aligned with the model's label map.
#[derive(Debug, Clone)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
    pub probabilities: Vec<(String, f32)>,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Parse detections from DETR-style output.
    ///
    /// `logits` is `[1, Q, C+1]` (the trailing class is no-object),
    /// `boxes` is `[1, Q, 4]` cxcywh normalized to the letterboxed input.
    /// Boxes are mapped back to original-image pixels and clamped.
    #[tracing::instrument(skip(self, logits, boxes, transform))]
    pub fn parse_detections(
        &self,
        logits: &ndarray::ArrayViewD<f32>,
        boxes: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        if logits.ndim() != 3 || boxes.ndim() != 3 {
            anyhow::bail!(
                "unexpected detector output ranks: logits {:?}, boxes {:?}",
                logits.shape(),
                boxes.shape()
            );
        }

        let num_queries = logits.shape()[1];
        let num_columns = logits.shape()[2];
        if num_columns < 2 || boxes.shape()[1] != num_queries || boxes.shape()[2] != 4 {
            anyhow::bail!(
                "unexpected detector output shapes: logits {:?}, boxes {:?}",
                logits.shape(),
                boxes.shape()
            );
        }

        let mut detections = Vec::new();

        for i in 0..num_queries {
            let row: Vec<f32> = (0..num_columns).map(|c| logits[[0, i, c]]).collect();
            let probs = softmax(&row);

            // Last column is the no-object class; argmax over the rest
            let (class_id, confidence) = probs[..num_columns - 1]
                .iter()
                .copied()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .expect("at least one real class column");

            if confidence < self.confidence_threshold {
                continue;
            }

            // Box in cxcywh, normalized to the input space
            let cx = boxes[[0, i, 0]];
            let cy = boxes[[0, i, 1]];
            let w = boxes[[0, i, 2]];
            let h = boxes[[0, i, 3]];

            let (x1_norm, y1_norm, x2_norm, y2_norm) = cxcywh_to_xyxy(cx, cy, w, h);

            // Denormalize to the letterboxed input
            let x1_input = x1_norm * transform.input_width as f32;
            let y1_input = y1_norm * transform.input_height as f32;
            let x2_input = x2_norm * transform.input_width as f32;
            let y2_input = y2_norm * transform.input_height as f32;

            // Inverse letterbox transform to original image coordinates
            let x1 = ((x1_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y1 = ((y1_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);
            let x2 = ((x2_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y2 = ((y2_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);

            detections.push(Detection {
                bbox: BoundingBox { x1, y1, x2, y2 },
                label: detector_class_name(class_id),
                confidence,
            });
        }

        Ok(detections)
    }
}

/// Parse a classifier's `[1, N]` (or `[N]`) logits into a labelled result.
#[tracing::instrument(skip(logits, labels))]
pub fn parse_classification(
    logits: &ndarray::ArrayViewD<f32>,
    labels: &LabelMap,
) -> anyhow::Result<Classification> {
    let row: Vec<f32> = logits.iter().copied().collect();
    if row.len() != labels.len() {
        anyhow::bail!(
            "classifier produced {} logits for {} labels",
            row.len(),
            labels.len()
        );
    }

    let probs = softmax(&row);

    let (class_id, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .expect("label map is never empty");

    let label = labels
        .get(class_id)
        .expect("argmax index is within the label map")
        .to_string();

    let probabilities = labels
        .iter()
        .map(String::from)
        .zip(probs.iter().copied())
        .collect();

    Ok(Classification {
        label,
        confidence,
        probabilities,
    })
}

/// Numerically stable softmax
#[inline]
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
