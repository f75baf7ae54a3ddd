//! Classifier Adapter

use crate::model::{ModelBundle, ModelCache, ModelConfig};
use crate::{InferenceError, PredictError};
use feature_engine::{ExtractorConfig, FeatureExtractor, FeatureVector};
use lightcurve::{FluxSeries, SeriesValidator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Cadence assumed when the caller does not supply one (minutes)
pub const DEFAULT_CADENCE_MINUTES: f64 = 2.0;

/// Planet probability plus the features that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability (0.0 to 1.0) that the light curve shows a transit
    pub planet_prob: f64,
    /// Features fed to the classifier, echoed for debugging
    pub features: FeatureVector,
}

/// Feature extraction and classification for one process.
///
/// Stateless per request apart from the shared, lazily loaded model.
#[derive(Debug)]
pub struct Predictor {
    extractor: FeatureExtractor,
    models: ModelCache,
    validator: SeriesValidator,
}

impl Predictor {
    /// Create a predictor from its parts
    pub fn new(extractor: FeatureExtractor, models: ModelCache, validator: SeriesValidator) -> Self {
        Self {
            extractor,
            models,
            validator,
        }
    }

    /// Create a predictor from configuration; the model loads on first use
    pub fn from_config(
        extractor: &ExtractorConfig,
        model: ModelConfig,
        validator: SeriesValidator,
    ) -> Self {
        info!(
            search = ?extractor.transit_search,
            min_transit_points = extractor.min_transit_points,
            min_points = validator.min_points,
            "Creating predictor"
        );
        Self::new(
            FeatureExtractor::from_config(extractor),
            ModelCache::new(model),
            validator,
        )
    }

    /// Load the model now instead of on the first request
    pub fn warm(&self) -> Result<Arc<ModelBundle>, InferenceError> {
        self.models.get()
    }

    /// Model bundle if it has been loaded
    pub fn loaded_model(&self) -> Option<Arc<ModelBundle>> {
        self.models.loaded()
    }

    /// Score a flux sequence sampled at a fixed cadence.
    ///
    /// Performs no minimum-length check; see [`Predictor::predict_values`].
    pub fn predict(&self, flux: &[f64], cadence_minutes: f64) -> Result<PredictionResult, PredictError> {
        let start = Instant::now();

        let series = FluxSeries::from_cadence(flux.to_vec(), cadence_minutes)?;
        let features = self.extractor.extract(&series);

        let bundle = self.models.get()?;
        let planet_prob = bundle.predict_proba(&features)?;

        debug!(
            points = flux.len(),
            planet_prob,
            latency_ms = start.elapsed().as_millis() as u64,
            "Prediction completed"
        );

        Ok(PredictionResult {
            planet_prob,
            features,
        })
    }

    /// Reject series below the minimum length, then [`Predictor::predict`]
    pub fn predict_values(&self, values: &[f64], cadence_minutes: f64) -> Result<PredictionResult, PredictError> {
        self.validator.check_values(values)?;
        self.predict(values, cadence_minutes)
    }

    /// Parse a comma/whitespace separated text blob, then [`Predictor::predict_values`]
    pub fn predict_text(&self, text: &str, cadence_minutes: f64) -> Result<PredictionResult, PredictError> {
        let values = self.validator.check_text(text)?;
        self.predict(&values, cadence_minutes)
    }
}
