use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};

use super::schemas::ErrorResponse;
use crate::classifier::ClassifierError;

/// Errors returned by the HTTP handlers.
///
/// Classifier error kinds are translated to status codes here and nowhere else.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file provided")]
    MissingFile,
    #[error("Malformed upload: {message}")]
    BadUpload { status: StatusCode, message: String },
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Keeps the status axum assigns to the failure, e.g. 413 past the body limit
    pub fn from_multipart(err: MultipartError) -> Self {
        Self::BadUpload {
            status: err.status(),
            message: err.body_text(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadUpload { status, .. } => *status,
            Self::Classifier(ClassifierError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Classifier(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Classifier(ClassifierError::InvalidInput(_)) => "Invalid image file".to_string(),
            Self::Classifier(ClassifierError::Inference(msg)) => format!("Prediction failed: {}", msg),
            Self::BadUpload { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "File too large".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        (status, Json(ErrorResponse { detail: self.detail() })).into_response()
    }
}
