//! HTTP Error Mapping
//!
//! Every failure becomes `{"detail": "..."}` with a status that tells the
//! caller whether retrying with different input can help.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inference_engine::{InferenceError, PredictError};
use lightcurve::InputError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-supplied data was unusable
    #[error(transparent)]
    Input(#[from] InputError),

    /// The classifier could not be loaded or run
    #[error(transparent)]
    Model(#[from] InferenceError),

    /// Request could not be extracted (bad JSON, query or multipart)
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },

    /// Worker task failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Bad request with a message
    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Input(_) => StatusCode::BAD_REQUEST,
            ApiError::Model(InferenceError::ModelLoad { .. } | InferenceError::ModelFormat { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Model(InferenceError::ModelLoad { .. } | InferenceError::ModelFormat { .. }) => {
                "Model unavailable".to_string()
            }
            ApiError::Model(_) | ApiError::Internal(_) => "Prediction failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Input(e) => ApiError::Input(e),
            PredictError::Model(e) => ApiError::Model(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            debug!(status = status.as_u16(), "Request rejected: {}", self);
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(InputError::EmptyInput).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(InferenceError::ModelFormat {
                path: PathBuf::from("model/xgb_model.json"),
                reason: "bad".into(),
            })
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(InferenceError::InferenceFailed("nan".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::bad_request("nope").status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_detail_hides_model_paths() {
        let err = ApiError::from(PredictError::Model(InferenceError::ModelFormat {
            path: PathBuf::from("/srv/model/xgb_model.json"),
            reason: "bad".into(),
        }));
        assert_eq!(err.detail(), "Model unavailable");

        let err = ApiError::from(PredictError::Input(InputError::TooShort { got: 2, min: 3 }));
        assert_eq!(err.detail(), "Not enough data points: got 2, need at least 3");
    }
}
