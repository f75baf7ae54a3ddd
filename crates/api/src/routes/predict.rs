//! Prediction Routes
//!
//! All three routes share one path: parse the request, score it on the
//! blocking pool, record metrics.

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        Multipart, Query, State,
    },
    Json,
};
use inference_engine::{PredictError, PredictionResult, Predictor};
use lightcurve::coerce::parse_or;
use lightcurve::decode_upload;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the uploaded light curve
const FILE_FIELD: &str = "file";

/// Body of `POST /predict`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// Flux values at a fixed cadence
    pub lightcurve: Vec<f64>,
    /// Sampling interval in minutes
    #[serde(default)]
    pub cadence_min: Option<f64>,
}

/// Query parameters for the text and file routes
#[derive(Debug, Default, Deserialize)]
pub struct CadenceQuery {
    /// Sampling interval in minutes; unparseable values fall back to the default
    pub cadence_min: Option<String>,
}

/// Score a JSON array of flux values
pub async fn from_json(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::Rejected {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;
    let cadence = state.cadence(request.cadence_min);

    score(state, "json", move |predictor| {
        predictor.predict_values(&request.lightcurve, cadence)
    })
    .await
}

/// Score a raw text body of comma/whitespace separated floats
pub async fn from_text(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CadenceQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let cadence = query_cadence(query, state.default_cadence_min)?;
    let body = body.map_err(|rejection| ApiError::Rejected {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;
    let text = decode_upload(&body);

    score(state, "text", move |predictor| predictor.predict_text(&text, cadence)).await
}

/// Score an uploaded .txt/.csv file sent as multipart field `file`
pub async fn from_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CadenceQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let cadence = query_cadence(query, state.default_cadence_min)?;
    let mut multipart = multipart.map_err(|rejection| ApiError::Rejected {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Malformed multipart body", e))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error("Could not read upload", e))?;
            upload = Some(bytes);
            break;
        }
    }

    let bytes = upload.ok_or_else(|| ApiError::bad_request(format!("Missing multipart field '{FILE_FIELD}'")))?;
    let text = decode_upload(&bytes);

    score(state, "file", move |predictor| predictor.predict_text(&text, cadence)).await
}

/// Keep the multipart error's own status so an oversized upload stays a 413
fn multipart_error(context: &str, error: MultipartError) -> ApiError {
    ApiError::Rejected {
        status: error.status(),
        detail: format!("{context}: {}", error.body_text()),
    }
}

fn query_cadence(query: Result<Query<CadenceQuery>, QueryRejection>, default: f64) -> Result<f64, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::Rejected {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;
    Ok(query
        .cadence_min
        .as_deref()
        .map_or(default, |raw| parse_or(raw, default)))
}

/// Run a prediction on the blocking pool and record its outcome
async fn score<F>(state: Arc<AppState>, source: &'static str, job: F) -> Result<Json<PredictionResult>, ApiError>
where
    F: FnOnce(&Predictor) -> Result<PredictionResult, PredictError> + Send + 'static,
{
    let start = Instant::now();
    let worker = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || job(&worker.predictor)).await?;

    match outcome {
        Ok(result) => {
            counter!("transit_predictions_total", "source" => source).increment(1);
            histogram!("transit_prediction_seconds").record(start.elapsed().as_secs_f64());
            histogram!("transit_planet_prob").record(result.planet_prob);
            Ok(Json(result))
        }
        Err(e) => {
            if e.is_client_error() {
                counter!("transit_rejections_total", "source" => source).increment(1);
            }
            Err(e.into())
        }
    }
}
