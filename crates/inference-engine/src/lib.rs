//! Transit Classifier Inference Engine
//!
//! Loads the pre-trained gradient-boosted tree ensemble once per process and
//! scores light curve feature vectors with it.

mod baseline;
mod classifier;
mod engine;
mod model;
mod xgboost;

pub use baseline::{BaselineScorer, BASELINE_FEATURES};
pub use classifier::Classifier;
pub use engine::{PredictionResult, Predictor, DEFAULT_CADENCE_MINUTES};
pub use model::{ModelBundle, ModelCache, ModelConfig, ModelKind};
pub use xgboost::XgbClassifier;

use lightcurve::InputError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors loading or running the classifier
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed for {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid model artifact {path}: {reason}")]
    ModelFormat { path: PathBuf, reason: String },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected} features, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
}

/// Errors from a prediction request.
///
/// Input errors are the caller's fault; model errors mean the service cannot
/// score anything.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] InferenceError),
}

impl PredictError {
    /// Whether the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Input(_))
    }
}
