//! HTTP serving layer.
//!
//! Routes:
//! - `GET /health`
//! - `GET /metrics` (Prometheus text format)
//! - `POST {prefix}/predict` (multipart field `file`)
//! - `GET {prefix}/model-info`
//!
//! The classifier is built once by the caller and shared by `Arc`; handlers
//! never mutate it.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use log::info;

mod error;
mod handlers;
pub mod metrics;
pub mod schemas;

pub use error::ApiError;
pub use metrics::Metrics;

use crate::config::Settings;
use crate::models::ModelInfo;
use crate::Classifier;

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub metrics: Arc<Metrics>,
    pub settings: Arc<Settings>,
    pub model_info: Arc<ModelInfo>,
}

impl AppState {
    pub fn new(
        classifier: Arc<Classifier>,
        settings: Settings,
        model_info: ModelInfo,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            classifier,
            metrics: Arc::new(Metrics::new()?),
            settings: Arc::new(settings),
            model_info: Arc::new(model_info),
        })
    }
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/predict", post(handlers::predict))
        .route("/model-info", get(handlers::model_info));

    let root = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics));

    // axum refuses to nest at the root
    let app = match state.settings.api_prefix.as_str() {
        "" | "/" => root.merge(api),
        prefix => root.nest(prefix, api.route("/health", get(handlers::health))),
    };

    app.layer(DefaultBodyLimit::max(state.settings.body_limit_bytes))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.metrics),
            metrics::track_predictions,
        ))
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let address = state.settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("{} listening on http://{}", state.settings.project_name, address);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}
