use crate::backend::Detector;
use crate::postprocessing::Detection;
use image::RgbImage;
use std::sync::Arc;

/// Thresholds for a detection to count as a close-up person in frame.
pub const MIN_CONFIDENCE: f32 = 0.7;
pub const MIN_RELATIVE_AREA: f32 = 0.05;
pub const MIN_RELATIVE_HEIGHT: f32 = 0.2;

/// Count detections that represent a valid close-up person.
///
/// A detection counts iff its label denotes a person AND confidence > 0.7
/// AND its box covers > 5% of the image area AND > 20% of the image height.
/// Boundary values are excluded.
pub fn count_valid_people(
    detections: &[Detection],
    image_width: u32,
    image_height: u32,
) -> usize {
    detections
        .iter()
        .filter(|d| is_valid_person(d, image_width, image_height))
        .count()
}

fn is_valid_person(detection: &Detection, image_width: u32, image_height: u32) -> bool {
    if !detection.label.to_lowercase().contains("person") {
        return false;
    }

    let image_area = (image_width as f32) * (image_height as f32);
    if image_area <= 0.0 {
        return false;
    }

    let relative_area = detection.bbox.area() / image_area;
    let relative_height = detection.bbox.height() / image_height as f32;

    detection.confidence > MIN_CONFIDENCE
        && relative_area > MIN_RELATIVE_AREA
        && relative_height > MIN_RELATIVE_HEIGHT
}

/// Runs the detector and applies the close-up filter.
///
/// Fail-open: a detector error is logged and reported as a count of 1, so
/// the caller proceeds as if a single person were present. Flagged for
/// product review in DESIGN.md.
pub struct PersonCounter {
    detector: Arc<dyn Detector>,
}

impl PersonCounter {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }

    pub fn count(&self, image: &RgbImage) -> usize {
        match self.detector.detect(image) {
            Ok(detections) => {
                let count = count_valid_people(&detections, image.width(), image.height());
                tracing::debug!(
                    raw_detections = detections.len(),
                    valid_people = count,
                    "Person detection complete"
                );
                count
            }
            Err(e) => {
                tracing::error!(error = %e, "Person detection failed, assuming single person");
                1
            }
        }
    }
}
