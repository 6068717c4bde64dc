use crate::error::ApiError;
use crate::response::{
    BatchItemResponse, BatchResponse, HealthResponse, PredictionResponse, RootResponse,
};
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
};
use inference::decode::MAX_IMAGE_BYTES;
use tower_http::cors::CorsLayer;

pub const MAX_BATCH_SIZE: usize = 10;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/predict-batch", post(predict_batch))
        .layer(DefaultBodyLimit::max(
            MAX_BATCH_SIZE * MAX_IMAGE_BYTES + 1024 * 1024,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse::current())
}

async fn health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ready())
}

/// One uploaded multipart file, fully buffered.
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: axum::body::Bytes,
}

impl UploadedFile {
    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

async fn collect_files(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        files.push(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }

    Ok(files)
}

async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let files = collect_files(&mut multipart).await?;
    let file = files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    if !file.is_image() {
        return Err(ApiError::BadRequest("File must be an image".to_string()));
    }

    let service = state.service.clone();
    let response = tokio::task::spawn_blocking(move || -> anyhow::Result<PredictionResponse> {
        let image = inference::decode_image(&file.bytes)?;
        let prediction = service.predict_image(&image)?;
        Ok(PredictionResponse::from_prediction(prediction))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Prediction failed: {}", e)))?
    .map_err(|e| ApiError::Internal(format!("Prediction failed: {}", e)))?;

    Ok(Json(response))
}

async fn predict_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let files = collect_files(&mut multipart).await?;

    if files.len() > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(
            "Maximum 10 images per batch".to_string(),
        ));
    }

    let service = state.service.clone();
    let results = tokio::task::spawn_blocking(move || {
        files
            .into_iter()
            .map(|file| predict_batch_item(&service, file))
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Batch prediction failed: {}", e)))?;

    Ok(Json(BatchResponse { results }))
}

/// Per-item pipeline: any failure becomes an error entry, never an aborted
/// batch, and only an exact count of 1 reaches the classifier.
fn predict_batch_item(
    service: &crate::predict::PredictService,
    file: UploadedFile,
) -> BatchItemResponse {
    if !file.is_image() {
        return BatchItemResponse::rejected(file.filename, "File must be an image".to_string());
    }

    let image = match inference::decode_image(&file.bytes) {
        Ok(image) => image,
        Err(e) => return BatchItemResponse::rejected(file.filename, e.to_string()),
    };

    match service.predict_image(&image) {
        Ok(crate::predict::Prediction::Single(classification)) => {
            BatchItemResponse::success(file.filename, classification)
        }
        Ok(prediction) => {
            BatchItemResponse::count_mismatch(file.filename, prediction.person_count())
        }
        Err(e) => BatchItemResponse::rejected(file.filename, e.to_string()),
    }
}
