//! Model Bundle and Process-Wide Cache

use crate::baseline::{BaselineScorer, BASELINE_FEATURES};
use crate::classifier::Classifier;
use crate::xgboost::XgbClassifier;
use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_NAMES};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Which classifier the bundle holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// XGBoost JSON model plus feature-order sidecar
    #[default]
    Xgboost,
    /// Built-in heuristic, no files needed
    Baseline,
}

/// Model artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the artifacts
    pub dir: PathBuf,
    /// Serialized classifier file name
    pub model_file: String,
    /// Ordered feature-name list file name
    pub feature_order_file: String,
    /// Classifier kind
    pub kind: ModelKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("model"),
            model_file: "xgb_model.json".to_string(),
            feature_order_file: "feature_order.json".to_string(),
            kind: ModelKind::default(),
        }
    }
}

impl ModelConfig {
    /// Baseline scorer configuration
    pub fn baseline() -> Self {
        Self {
            kind: ModelKind::Baseline,
            ..Default::default()
        }
    }

    /// XGBoost artifacts in `dir` with default file names
    pub fn xgboost(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Full path of the serialized classifier
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    /// Full path of the feature-order sidecar
    pub fn feature_order_path(&self) -> PathBuf {
        self.dir.join(&self.feature_order_file)
    }
}

/// A classifier together with the feature order it was trained on
pub struct ModelBundle {
    classifier: Box<dyn Classifier>,
    feature_order: Vec<String>,
}

impl ModelBundle {
    /// Pair a classifier with its expected feature order
    pub fn new(classifier: Box<dyn Classifier>, feature_order: Vec<String>) -> Self {
        Self {
            classifier,
            feature_order,
        }
    }

    /// The built-in baseline scorer
    pub fn baseline() -> Self {
        Self::new(
            Box::new(BaselineScorer::default()),
            BASELINE_FEATURES.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Load the bundle described by `config` (blocking file I/O)
    pub fn load(config: &ModelConfig) -> Result<Self, InferenceError> {
        match config.kind {
            ModelKind::Baseline => {
                info!("Using baseline scorer");
                Ok(Self::baseline())
            }
            ModelKind::Xgboost => Self::load_xgboost(config),
        }
    }

    fn load_xgboost(config: &ModelConfig) -> Result<Self, InferenceError> {
        let order_path = config.feature_order_path();
        let feature_order = read_feature_order(&order_path)?;

        let model_path = config.model_path();
        let bytes = read_artifact(&model_path)?;
        let model = XgbClassifier::from_json_slice(&bytes).map_err(|reason| {
            InferenceError::ModelFormat {
                path: model_path.clone(),
                reason,
            }
        })?;

        if model.num_feature() > 0 && model.num_feature() != feature_order.len() {
            return Err(InferenceError::ModelFormat {
                path: order_path,
                reason: format!(
                    "model expects {} features but the order lists {}",
                    model.num_feature(),
                    feature_order.len()
                ),
            });
        }
        if let Some(max) = model.max_feature_index() {
            if max >= feature_order.len() {
                return Err(InferenceError::ModelFormat {
                    path: model_path,
                    reason: format!(
                        "split on feature {max} but only {} features are ordered",
                        feature_order.len()
                    ),
                });
            }
        }

        info!(
            path = %model_path.display(),
            trees = model.num_trees(),
            features = feature_order.len(),
            "Loaded XGBoost model"
        );
        Ok(Self::new(Box::new(model), feature_order))
    }

    /// Feature names in classifier input order
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    /// Classifier name
    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Single input row in bundle order; names absent from the vector are 0.0
    pub fn input_row(&self, features: &FeatureVector) -> Vec<f64> {
        self.feature_order
            .iter()
            .map(|name| features.get(name).unwrap_or(0.0))
            .collect()
    }

    /// Probability of the positive class for one feature vector
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let row = self.input_row(features);
        let prob = self.classifier.predict_proba(&row)?;
        if !(0.0..=1.0).contains(&prob) {
            return Err(InferenceError::InferenceFailed(format!(
                "{} returned probability {prob}",
                self.classifier.name()
            )));
        }
        Ok(prob)
    }
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("classifier", &self.classifier.name())
            .field("feature_order", &self.feature_order)
            .finish()
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, InferenceError> {
    std::fs::read(path).map_err(|source| InferenceError::ModelLoad {
        path: path.to_path_buf(),
        source,
    })
}

fn read_feature_order(path: &Path) -> Result<Vec<String>, InferenceError> {
    let bytes = read_artifact(path)?;
    let order: Vec<String> =
        serde_json::from_slice(&bytes).map_err(|e| InferenceError::ModelFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if order.is_empty() {
        return Err(InferenceError::ModelFormat {
            path: path.to_path_buf(),
            reason: "feature order is empty".to_string(),
        });
    }
    for name in order.iter().filter(|n| !FEATURE_NAMES.contains(&n.as_str())) {
        warn!(feature = %name, "Model expects a feature the extractor does not produce; using 0.0");
    }
    Ok(order)
}

type Loader = Box<dyn Fn() -> Result<ModelBundle, InferenceError> + Send + Sync>;

/// Lazily loaded, shared model bundle.
///
/// The loader runs at most once to completion; concurrent callers block
/// until it finishes and then share the same `Arc`. A failed load leaves
/// the cache empty.
pub struct ModelCache {
    loader: Loader,
    cell: OnceCell<Arc<ModelBundle>>,
}

impl ModelCache {
    /// Cache that loads from `config` on first use
    pub fn new(config: ModelConfig) -> Self {
        Self::with_loader(move || ModelBundle::load(&config))
    }

    /// Cache around an arbitrary loader
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<ModelBundle, InferenceError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Cache that already holds `bundle`
    pub fn preloaded(bundle: ModelBundle) -> Self {
        Self {
            loader: Box::new(|| -> Result<ModelBundle, InferenceError> {
                Err(InferenceError::InferenceFailed(
                    "preloaded cache has no loader".to_string(),
                ))
            }),
            cell: OnceCell::with_value(Arc::new(bundle)),
        }
    }

    /// Shared bundle, loading it on first call
    pub fn get(&self) -> Result<Arc<ModelBundle>, InferenceError> {
        self.cell
            .get_or_try_init(|| (self.loader)().map(Arc::new))
            .map(Arc::clone)
    }

    /// Bundle if already loaded, without triggering a load
    pub fn loaded(&self) -> Option<Arc<ModelBundle>> {
        self.cell.get().cloned()
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("loaded", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    pub(crate) fn fixture_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/model")
    }

    pub(crate) fn fixture_config() -> ModelConfig {
        ModelConfig::xgboost(fixture_dir())
    }

    fn sigmoid(m: f64) -> f64 {
        1.0 / (1.0 + (-m).exp())
    }

    #[test]
    fn test_load_fixture_model() {
        let bundle = ModelBundle::load(&fixture_config()).unwrap();
        assert_eq!(bundle.classifier_name(), "xgboost");
        assert_eq!(bundle.feature_order().len(), 11);
        assert_eq!(bundle.feature_order()[0], "max_drop");
    }

    #[test]
    fn test_input_row_follows_bundle_order() {
        let bundle = ModelBundle::load(&fixture_config()).unwrap();
        let features = FeatureVector {
            max_drop: 0.02,
            std: 0.001,
            tls_sde: 10.0,
            tls_transit_count: 3,
            ..Default::default()
        };
        let row = bundle.input_row(&features);
        assert_eq!(row.len(), 11);
        assert_eq!(&row[..3], &[0.02, 0.001, 10.0]);
        assert_eq!(row[9], 3.0);
        // "mean" is not produced by the extractor
        assert_eq!(row[10], 0.0);
    }

    #[test]
    fn test_fixture_probabilities() {
        let bundle = ModelBundle::load(&fixture_config()).unwrap();

        let quiet = FeatureVector::default();
        let p = bundle.predict_proba(&quiet).unwrap();
        assert!((p - sigmoid(-0.55)).abs() < 1e-6);

        let transit = FeatureVector {
            max_drop: 0.02,
            std: 0.001,
            tls_sde: 10.0,
            ..Default::default()
        };
        let p = bundle.predict_proba(&transit).unwrap();
        assert!((p - sigmoid(1.15)).abs() < 1e-6);

        let noisy = FeatureVector {
            std: 0.01,
            ..transit
        };
        let p = bundle.predict_proba(&noisy).unwrap();
        assert!((p - sigmoid(0.75)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_dir() {
        let err = ModelBundle::load(&ModelConfig::xgboost("/nonexistent/model")).unwrap_err();
        assert!(matches!(err, InferenceError::ModelLoad { .. }));
    }

    #[test]
    fn test_feature_order_mismatch_is_format_error() {
        let config = ModelConfig {
            feature_order_file: "xgb_model.json".to_string(),
            ..fixture_config()
        };
        let err = ModelBundle::load(&config).unwrap_err();
        assert!(matches!(err, InferenceError::ModelFormat { .. }));
    }

    #[test]
    fn test_baseline_needs_no_files() {
        let config = ModelConfig {
            dir: PathBuf::from("/nonexistent"),
            ..ModelConfig::baseline()
        };
        let bundle = ModelBundle::load(&config).unwrap();
        assert_eq!(bundle.classifier_name(), "baseline");
        assert_eq!(bundle.feature_order(), &["max_drop", "std"]);
    }

    #[test]
    fn test_concurrent_get_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let cache = Arc::new(ModelCache::with_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(ModelBundle::baseline())
        }));

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get().unwrap()
                })
            })
            .collect();

        let bundles: Vec<Arc<ModelBundle>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(bundles.iter().all(|b| Arc::ptr_eq(b, &bundles[0])));
        assert!(Arc::ptr_eq(&cache.loaded().unwrap(), &bundles[0]));
    }

    #[test]
    fn test_failed_load_leaves_cache_empty() {
        let cache = ModelCache::new(ModelConfig::xgboost("/nonexistent/model"));
        assert!(cache.get().is_err());
        assert!(cache.loaded().is_none());
    }

    #[test]
    fn test_preloaded_cache() {
        let cache = ModelCache::preloaded(ModelBundle::baseline());
        assert!(cache.loaded().is_some());
        assert_eq!(cache.get().unwrap().classifier_name(), "baseline");
    }
}
