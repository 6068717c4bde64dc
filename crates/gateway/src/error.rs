use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Infrastructure-level failures, mapped to HTTP error statuses with a
/// `detail` message. Domain rejections never pass through here; they ride
/// in 200 payloads (see `response::PredictionResponse`).
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => {
                tracing::warn!(detail = %detail, "Rejected request");
                (StatusCode::BAD_REQUEST, detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
