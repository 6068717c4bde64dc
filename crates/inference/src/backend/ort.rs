use super::{Classifier, Detector};
use crate::labels::LabelMap;
use crate::postprocessing::{Classification, Detection, PostProcessor, parse_classification};
use crate::preprocessing::PreProcessor;
use image::RgbImage;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::sync::Mutex;

/// ViT-style classifiers take a fixed 224x224 input.
pub const CLASSIFIER_INPUT_SIZE: (u32, u32) = (224, 224);

#[derive(Debug, Clone, Copy)]
pub enum ExecutionProvider {
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
}

fn build_session(path: &str, provider: ExecutionProvider) -> anyhow::Result<Session> {
    // Initialize ORT environment (idempotent)
    let _ = ort::init().commit();

    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?;

    let builder = match provider {
        #[cfg(feature = "cuda")]
        ExecutionProvider::Cuda => {
            tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
            builder.with_execution_providers([
                ort::execution_providers::CUDAExecutionProvider::default()
                    .with_device_id(0)
                    .build()
                    .error_on_failure(),
            ])?
        }
        ExecutionProvider::Cpu => {
            tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            builder
        }
    };

    let session = builder.commit_from_file(path)?;

    tracing::info!("Model loaded from {}", path);
    Ok(session)
}

/// DETR-style detector backed by an ONNX Runtime session.
///
/// The session and the preprocessor's scratch buffers need exclusive access
/// per run, so both sit behind one mutex; callers share the detector freely.
pub struct OrtDetector {
    inner: Mutex<DetectorInner>,
    postprocessor: PostProcessor,
}

struct DetectorInner {
    session: Session,
    preprocessor: PreProcessor,
}

impl OrtDetector {
    pub fn load(
        path: &str,
        input_size: (u32, u32),
        confidence_threshold: f32,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        let session = build_session(path, provider)?;
        Ok(Self {
            inner: Mutex::new(DetectorInner {
                session,
                preprocessor: PreProcessor::detector(input_size),
            }),
            postprocessor: PostProcessor::new(confidence_threshold),
        })
    }
}

impl Detector for OrtDetector {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("detector session lock poisoned"))?;
        let inner = &mut *inner;

        let (input, transform) = inner.preprocessor.preprocess(image)?;

        let _infer_span = tracing::info_span!("detector_inference").entered();
        let outputs = inner.session.run(ort::inputs![
            "pixel_values" => TensorRef::from_array_view(input.view())?
        ])?;

        let logits = outputs["logits"].try_extract_array::<f32>()?;
        let boxes = outputs["pred_boxes"].try_extract_array::<f32>()?;

        self.postprocessor
            .parse_detections(&logits.view(), &boxes.view(), &transform)
    }
}

/// ViT-style classifier backed by an ONNX Runtime session.
pub struct OrtClassifier {
    inner: Mutex<ClassifierInner>,
    labels: LabelMap,
}

struct ClassifierInner {
    session: Session,
    preprocessor: PreProcessor,
}

impl OrtClassifier {
    pub fn load(path: &str, labels: LabelMap, provider: ExecutionProvider) -> anyhow::Result<Self> {
        let session = build_session(path, provider)?;
        Ok(Self {
            inner: Mutex::new(ClassifierInner {
                session,
                preprocessor: PreProcessor::classifier(CLASSIFIER_INPUT_SIZE),
            }),
            labels,
        })
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }
}

impl Classifier for OrtClassifier {
    fn classify(&self, image: &RgbImage) -> anyhow::Result<Classification> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("classifier session lock poisoned"))?;
        let inner = &mut *inner;

        let (input, _) = inner.preprocessor.preprocess(image)?;

        let _infer_span = tracing::info_span!("classifier_inference").entered();
        let outputs = inner.session.run(ort::inputs![
            "pixel_values" => TensorRef::from_array_view(input.view())?
        ])?;

        let logits = outputs["logits"].try_extract_array::<f32>()?;

        parse_classification(&logits.view(), &self.labels)
    }
}
