use crate::predict::Prediction;
use inference::Classification;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

impl RootResponse {
    pub fn current() -> Self {
        Self {
            message: "Gender Classification API",
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Init-state booleans. The process refuses to start before every model
/// handle is loaded, so a serving process always reports true; the shape is
/// kept for clients that poll it.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub processor_loaded: bool,
    pub detector_loaded: bool,
}

impl HealthResponse {
    pub fn ready() -> Self {
        Self {
            status: "healthy",
            model_loaded: true,
            processor_loaded: true,
            detector_loaded: true,
        }
    }
}

/// `/predict` payload. Domain rejections keep a 200 status and put the
/// reason here; callers must check `error`, not the status code.
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: Option<String>,
    pub confidence: f32,
    pub person_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<serde_json::Map<String, serde_json::Value>>,
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn from_prediction(prediction: Prediction) -> Self {
        match prediction {
            Prediction::NoPerson => Self {
                prediction: None,
                confidence: 0.0,
                person_count: 0,
                probabilities: None,
                error: Some("No person detected in image".to_string()),
            },
            Prediction::MultiplePeople(count) => Self {
                prediction: None,
                confidence: 0.0,
                person_count: count,
                probabilities: None,
                error: Some(format!(
                    "Multiple people detected ({} people). Please use single-person images.",
                    count
                )),
            },
            Prediction::Single(classification) => Self {
                probabilities: Some(probabilities_map(&classification)),
                prediction: Some(classification.label),
                confidence: classification.confidence,
                person_count: 1,
                error: None,
            },
        }
    }
}

/// One entry of the `/predict-batch` result list.
///
/// `person_count` is absent for items rejected before detection ran
/// (bad content type, undecodable bytes).
#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub filename: String,
    pub prediction: Option<String>,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_count: Option<usize>,
    pub error: Option<String>,
}

impl BatchItemResponse {
    /// Rejected before the pipeline ran (content type, decode, hard failure).
    pub fn rejected(filename: String, error: String) -> Self {
        Self {
            filename,
            prediction: None,
            confidence: 0.0,
            person_count: None,
            error: Some(error),
        }
    }

    /// Person-count gate refused the image.
    pub fn count_mismatch(filename: String, person_count: usize) -> Self {
        Self {
            filename,
            prediction: None,
            confidence: 0.0,
            person_count: Some(person_count),
            error: Some(format!("Expected 1 person, found {}", person_count)),
        }
    }

    pub fn success(filename: String, classification: Classification) -> Self {
        Self {
            filename,
            prediction: Some(classification.label),
            confidence: classification.confidence,
            person_count: Some(1),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItemResponse>,
}

fn probabilities_map(
    classification: &Classification,
) -> serde_json::Map<String, serde_json::Value> {
    classification
        .probabilities
        .iter()
        .map(|(label, p)| (label.clone(), serde_json::json!(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification() -> Classification {
        Classification {
            label: "male".to_string(),
            confidence: 0.87,
            probabilities: vec![("male".to_string(), 0.87), ("female".to_string(), 0.13)],
        }
    }

    #[test]
    fn test_success_response_shape() {
        let response =
            PredictionResponse::from_prediction(Prediction::Single(classification()));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["prediction"], "male");
        assert_eq!(json["person_count"], 1);
        assert_eq!(json["error"], serde_json::Value::Null);
        assert!(
            (json["probabilities"]["male"].as_f64().unwrap() - 0.87).abs() < 1e-6,
            "Probabilities should carry the full per-class map"
        );
    }

    #[test]
    fn test_probability_keys_keep_class_order() {
        let response =
            PredictionResponse::from_prediction(Prediction::Single(classification()));
        let keys: Vec<&String> = response.probabilities.as_ref().unwrap().keys().collect();
        assert_eq!(keys, ["male", "female"], "Map order should follow class ids");
    }

    #[test]
    fn test_no_person_response_shape() {
        let response = PredictionResponse::from_prediction(Prediction::NoPerson);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["prediction"], serde_json::Value::Null);
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["person_count"], 0);
        assert_eq!(json["error"], "No person detected in image");
        assert!(
            json.get("probabilities").is_none(),
            "Rejections must not include probabilities"
        );
    }

    #[test]
    fn test_multiple_people_message_contains_count() {
        let response = PredictionResponse::from_prediction(Prediction::MultiplePeople(3));
        let error = response.error.unwrap();
        assert!(
            error.contains("3 people"),
            "Error should name the count: {}",
            error
        );
        assert_eq!(response.person_count, 3);
    }

    #[test]
    fn test_batch_item_count_mismatch_keeps_count() {
        let item = BatchItemResponse::count_mismatch("a.jpg".to_string(), 0);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["filename"], "a.jpg");
        assert_eq!(json["person_count"], 0);
        assert_eq!(json["error"], "Expected 1 person, found 0");
    }

    #[test]
    fn test_batch_item_rejection_omits_count() {
        let item =
            BatchItemResponse::rejected("a.txt".to_string(), "File must be an image".to_string());
        let json = serde_json::to_value(&item).unwrap();

        assert!(
            json.get("person_count").is_none(),
            "Items rejected before detection carry no person_count"
        );
    }
}
