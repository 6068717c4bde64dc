use crate::predict::PredictService;
use inference::{Classifier, Detector};
use std::sync::Arc;

/// Process-wide context handed to every handler. Built once at startup,
/// never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictService>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            service: Arc::new(PredictService::new(detector, classifier)),
        }
    }
}
