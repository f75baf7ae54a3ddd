//! Classifier interface

use crate::InferenceError;

/// A binary classifier over a single numeric feature row
pub trait Classifier: Send + Sync {
    /// Probability of the positive ("planet") class, in [0, 1]
    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError>;

    /// Classifier name for logs and health output
    fn name(&self) -> &str;
}

/// Logistic link from margin to probability
pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
