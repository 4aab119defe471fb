use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use log::debug;

use super::error::ApiError;
use super::schemas::{HealthCheckResponse, ModelInfoResponse, PredictionResponse};
use super::AppState;

pub async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "OK".to_string(),
    })
}

/// Classifies the image uploaded in the multipart field `file`
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Request is not a multipart upload: {}", e);
        ApiError::MissingFile
    })?;
    let contents = read_file_field(&mut multipart)
        .await?
        .ok_or(ApiError::MissingFile)?;
    debug!("Received upload of {} bytes", contents.len());

    // decoding and inference are CPU bound
    let classifier = Arc::clone(&state.classifier);
    let predictions = tokio::task::spawn_blocking(move || classifier.predict_bytes(&contents))
        .await
        .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))??;

    Ok(Json(PredictionResponse { predictions }))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Bytes>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(ApiError::from_multipart)?;
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}

/// Describes the served model and its tensor shapes
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let info = state.classifier.info();
    Json(ModelInfoResponse {
        name: state.model_info.display_name.clone(),
        description: state.model_info.description.clone(),
        input_shape: info.input_shape,
        output_shape: info.output_shape,
    })
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(format!("Failed to render metrics: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
