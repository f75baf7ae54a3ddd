//! Service Status Routes

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Response for `/`
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub message: &'static str,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelStatus,
}

/// Loaded model summary
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub kind: Option<String>,
    pub features: Vec<String>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        app: "Orama X",
        message: "Hello from app.oramax.space!",
    })
}

/// Health check handler. Reports unavailable until the model is loaded.
pub async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model = match state.predictor.loaded_model() {
        Some(bundle) => ModelStatus {
            loaded: true,
            kind: Some(bundle.classifier_name().to_string()),
            features: bundle.feature_order().to_vec(),
        },
        None => ModelStatus {
            loaded: false,
            kind: None,
            features: Vec::new(),
        },
    };

    let (code, status) = if model.loaded {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    let response = HealthResponse {
        ok: model.loaded,
        status,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model,
    };

    (code, Json(response))
}

/// Prometheus exposition, 404 when no recorder is installed
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
