use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// COCO class names as indexed by DETR-style detectors.
///
/// Index 0 and the other "N/A" slots are gaps in the original COCO
/// labelling; the detector can still emit them, so they stay in the table.
pub const DETECTOR_CLASSES: [&str; 91] = [
    "N/A",
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "N/A",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "N/A",
    "backpack",
    "umbrella",
    "N/A",
    "N/A",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "N/A",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "N/A",
    "dining table",
    "N/A",
    "N/A",
    "toilet",
    "N/A",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "N/A",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Class name for a detector class index; out-of-range indices map to "N/A".
pub fn detector_class_name(class_id: usize) -> &'static str {
    DETECTOR_CLASSES.get(class_id).copied().unwrap_or("N/A")
}

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("failed to read model config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("id2label has a non-numeric key: {0}")]
    BadKey(String),

    #[error("id2label is missing an entry for class {0}")]
    MissingClass(usize),

    #[error("id2label is empty")]
    Empty,
}

/// HuggingFace-style model config; only the label mapping is read.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

/// Classifier label set, ordered by class index.
#[derive(Debug, Clone)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Build from an explicit index-ordered label list.
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }
        Ok(Self { labels })
    }

    /// Load the `id2label` mapping from a model directory's `config.json`.
    pub fn from_config_file(path: &Path) -> Result<Self, LabelError> {
        let raw = std::fs::read_to_string(path)?;
        let config: ModelConfig = serde_json::from_str(&raw)?;

        let mut entries = config
            .id2label
            .into_iter()
            .map(|(key, label)| {
                let idx: usize = key.parse().map_err(|_| LabelError::BadKey(key.clone()))?;
                Ok((idx, label))
            })
            .collect::<Result<Vec<_>, LabelError>>()?;
        entries.sort_by_key(|(idx, _)| *idx);

        let labels = entries
            .into_iter()
            .enumerate()
            .map(|(expected, (idx, label))| {
                if idx != expected {
                    return Err(LabelError::MissingClass(expected));
                }
                Ok(label)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(labels)
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
