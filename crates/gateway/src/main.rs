use common::TelemetryGuard;
use gateway::{
    config::GatewayConfig,
    logging::setup_logging,
    routes,
    state::AppState,
};
use inference::backend::ort::{ExecutionProvider, OrtClassifier, OrtDetector};
use inference::labels::LabelMap;
use modelstore::{ModelStore, ModelStoreConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;

    // TelemetryGuard installs the tracing subscriber itself; only one of the
    // two paths may run.
    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            config.environment.clone(),
        )?),
        None => {
            setup_logging(&config);
            None
        }
    };

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    match config.model_endpoint.clone() {
        Some(endpoint) => {
            let store = ModelStore::new(ModelStoreConfig {
                endpoint,
                bucket: config.model_bucket.clone(),
                prefix: config.model_prefix.clone(),
                local_dir: config.model_dir.clone(),
            });
            store.sync_if_missing().await?;
        }
        None => {
            if !config.model_dir.exists() {
                anyhow::bail!(
                    "model directory {} is missing and no MODEL_ENDPOINT is configured",
                    config.model_dir.display()
                );
            }
        }
    }

    #[cfg(feature = "cuda")]
    let provider = ExecutionProvider::Cuda;
    #[cfg(not(feature = "cuda"))]
    let provider = ExecutionProvider::Cpu;

    tracing::info!("Loading classification model");
    let labels = LabelMap::from_config_file(&config.classifier_config_path())?;
    let classifier = OrtClassifier::load(
        &config.classifier_model_path().to_string_lossy(),
        labels,
        provider,
    )?;

    tracing::info!("Loading person detection model");
    let detector = OrtDetector::load(
        &config.detector_model_path().to_string_lossy(),
        config.detector_input_size,
        config.detector_confidence_threshold,
        provider,
    )?;

    tracing::info!("All models loaded successfully");

    let state = AppState::new(Arc::new(detector), Arc::new(classifier));
    let app = routes::app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
