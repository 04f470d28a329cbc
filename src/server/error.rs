//! Error-to-HTTP response conversion.
//!
//! Every failure leaves a handler as a JSON `{"error": ...}` body with a
//! status reflecting client vs. server fault. Only the short message goes to
//! the client; details stay in the logs.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::artifacts::ArtifactNotFound;
use crate::pipeline::PipelineError;

/// Error returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Failure from the conversion pipeline.
    Pipeline(PipelineError),
    /// Unknown, expired, or malformed download identifier.
    NotFound,
    /// The request body could not be read as multipart form data.
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(e) => StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Rejected { status, .. } => *status,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Pipeline(e) => e.to_string(),
            ApiError::NotFound => ArtifactNotFound.to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<ArtifactNotFound> for ApiError {
    fn from(_: ArtifactNotFound) -> Self {
        ApiError::NotFound
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Uploaded audio is too large".to_string()
        } else {
            e.body_text()
        };
        ApiError::Rejected { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            match &self {
                ApiError::Pipeline(PipelineError::Storage(source)) => tracing::error!(
                    status = %status,
                    error = %message,
                    source = %source,
                    "Server error in API handler"
                ),
                _ => tracing::error!(status = %status, error = %message, "Server error in API handler"),
            }
        }

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
