use std::env;
use std::path::PathBuf;

pub use common::{Environment, LogLevel};

pub const DEFAULT_DETECTOR_INPUT_SIZE: (u32, u32) = (640, 640);
pub const DEFAULT_DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.9;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Local model directory; synced from the object store when absent.
    pub model_dir: PathBuf,
    pub classifier_model_file: String,
    pub detector_model_file: String,
    pub detector_input_size: (u32, u32),
    pub detector_confidence_threshold: f32,
    /// Object store base URL; no sync is attempted when unset.
    pub model_endpoint: Option<String>,
    pub model_bucket: String,
    pub model_prefix: String,
    pub otel_endpoint: Option<String>,
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();
        let log_level = LogLevel::from_env();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let model_dir = env::var("MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./model"));

        let classifier_model_file =
            env::var("CLASSIFIER_MODEL_FILE").unwrap_or_else(|_| "model.onnx".to_string());

        let detector_model_file =
            env::var("DETECTOR_MODEL_FILE").unwrap_or_else(|_| "detector.onnx".to_string());

        let input_width = env::var("INPUT_WIDTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE.0);

        let input_height = env::var("INPUT_HEIGHT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE.1);

        let detector_confidence_threshold = env::var("DETECTOR_CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DETECTOR_CONFIDENCE_THRESHOLD);

        let model_endpoint = env::var("MODEL_ENDPOINT").ok();

        let model_bucket = env::var("MODEL_BUCKET").unwrap_or_else(|_| "models".to_string());

        let model_prefix = env::var("MODEL_PREFIX")
            .unwrap_or_else(|_| "models/gender-classification-final".to_string());

        let otel_endpoint = env::var("OTEL_ENDPOINT").ok();

        Ok(Self {
            log_level,
            environment,
            host,
            port,
            model_dir,
            classifier_model_file,
            detector_model_file,
            detector_input_size: (input_width, input_height),
            detector_confidence_threshold,
            model_endpoint,
            model_bucket,
            model_prefix,
            otel_endpoint,
        })
    }

    pub fn classifier_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.classifier_model_file)
    }

    pub fn classifier_config_path(&self) -> PathBuf {
        self.model_dir.join("config.json")
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.detector_model_file)
    }
}
