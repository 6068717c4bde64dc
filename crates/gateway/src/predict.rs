use inference::{Classification, Classifier, Detector, PersonCounter, RgbImage};
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;
use std::time::Instant;

/// What a single image resolves to once the person-count gate has run.
///
/// `NoPerson` and `MultiplePeople` are domain rejections, not errors: they
/// travel back to the client in a 200 payload.
#[derive(Debug)]
pub enum Prediction {
    NoPerson,
    MultiplePeople(usize),
    Single(Classification),
}

impl Prediction {
    pub fn person_count(&self) -> usize {
        match self {
            Prediction::NoPerson => 0,
            Prediction::MultiplePeople(n) => *n,
            Prediction::Single(_) => 1,
        }
    }
}

fn init_metrics(meter_name: &'static str) -> (Histogram<f64>, Counter<u64>, Counter<u64>) {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.25, 0.5, 1.0, 2.5, 5.0,
    ];
    let duration_histogram: Histogram<f64> = meter
        .f64_histogram("prediction_duration_seconds")
        .with_description("Time to process a single image (detect + filter + classify)")
        .with_unit("s")
        .with_boundaries(latency_buckets.to_vec())
        .build();
    let predictions_counter: Counter<u64> = meter
        .u64_counter("predictions_total")
        .with_description("Images that reached the classifier and produced a label")
        .build();
    let rejections_counter: Counter<u64> = meter
        .u64_counter("prediction_rejections_total")
        .with_description("Images rejected by the person-count gate")
        .build();

    (duration_histogram, predictions_counter, rejections_counter)
}

/// The decode-agnostic prediction pipeline: person-count gate, then
/// classification. Holds the process-wide model handles; constructed once
/// at startup and shared immutably across requests.
pub struct PredictService {
    counter: PersonCounter,
    classifier: Arc<dyn Classifier>,
    duration_histogram: Histogram<f64>,
    predictions_counter: Counter<u64>,
    rejections_counter: Counter<u64>,
}

impl PredictService {
    pub fn new(detector: Arc<dyn Detector>, classifier: Arc<dyn Classifier>) -> Self {
        let (duration_histogram, predictions_counter, rejections_counter) =
            init_metrics("gateway");
        Self {
            counter: PersonCounter::new(detector),
            classifier,
            duration_histogram,
            predictions_counter,
            rejections_counter,
        }
    }

    /// Run the pipeline over a decoded image.
    ///
    /// Only classifier failures surface as errors; detector failures are
    /// absorbed by the fail-open person counter.
    pub fn predict_image(&self, image: &RgbImage) -> anyhow::Result<Prediction> {
        let span = tracing::info_span!(
            "predict_image",
            width = image.width(),
            height = image.height()
        );
        let _enter = span.enter();

        let start = Instant::now();

        let person_count = self.counter.count(image);

        let outcome = match person_count {
            1 => {
                let classification = self.classifier.classify(image)?;
                tracing::debug!(
                    label = %classification.label,
                    confidence = classification.confidence,
                    "Image classified"
                );
                self.predictions_counter.add(1, &[]);
                Prediction::Single(classification)
            }
            0 => {
                tracing::debug!("No valid person in frame");
                self.rejections_counter.add(1, &[]);
                Prediction::NoPerson
            }
            n => {
                tracing::debug!(person_count = n, "Multiple people in frame");
                self.rejections_counter.add(1, &[]);
                Prediction::MultiplePeople(n)
            }
        };

        self.duration_histogram
            .record(start.elapsed().as_secs_f64(), &[]);

        Ok(outcome)
    }
}
