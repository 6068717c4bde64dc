use crate::postprocessing::{Classification, Detection};
use image::RgbImage;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Person/object detection capability.
///
/// Implementations run a detection model over a decoded image and return
/// labelled boxes in original-image pixel coordinates.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<Detection>>;
}

/// Image classification capability.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> anyhow::Result<Classification>;
}
