use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sift_query::CompileError;

#[derive(Debug)]
pub enum ApiError {
    Compile(CompileError),
}

impl From<CompileError> for ApiError {
    fn from(e: CompileError) -> Self {
        ApiError::Compile(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Compile(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };

        tracing::debug!(%status, %message, "rejecting request");
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
