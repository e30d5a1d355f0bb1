use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kakeibo_ocr::{PipelineError, SubmissionError};
use kakeibo_storage::StorageError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Everything a handler can fail with. Each variant maps to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    OcrUnavailable(String),
    #[error("{0}")]
    OcrExecution(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::Decode(_) => "decode_error",
            ApiError::OcrUnavailable(_) => "ocr_unavailable",
            ApiError::OcrExecution(_) => "ocr_execution_error",
            ApiError::Storage(_) => "storage_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::OcrExecution(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log against `operation` and hand the error back for the response.
    pub fn logged(self, operation: &'static str) -> Self {
        if self.status().is_server_error() {
            error!(operation, kind = self.kind(), error = %self, "Request failed");
        } else {
            warn!(operation, kind = self.kind(), error = %self, "Request rejected");
        }
        self
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let message = e.to_string();
        match e {
            PipelineError::InvalidInput(_) => ApiError::InvalidInput(message),
            PipelineError::Decode(_) => ApiError::Decode(message),
            PipelineError::OcrUnavailable(_) => ApiError::OcrUnavailable(message),
            PipelineError::OcrExecution(_) => ApiError::OcrExecution(message),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        ApiError::from(PipelineError::from(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
