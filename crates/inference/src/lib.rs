pub mod backend;
pub mod decode;
pub mod filter;
pub mod labels;
pub mod postprocessing;
pub mod preprocessing;

// Re-export commonly used types for convenience
pub use backend::{Classifier, Detector};
pub use decode::{DecodeError, decode_image};
pub use filter::PersonCounter;
pub use image::RgbImage;
pub use labels::LabelMap;
pub use postprocessing::{BoundingBox, Classification, Detection};
