//! Heuristic Baseline Scorer
//!
//! A fixed logistic rule over dip depth and scatter. Needs no model files,
//! so it can serve demos and smoke tests; it is only used when configured.

use crate::classifier::{sigmoid, Classifier};
use crate::InferenceError;

/// Feature order the baseline reads
pub const BASELINE_FEATURES: [&str; 2] = ["max_drop", "std"];

/// `logit = intercept + drop_weight * max_drop + std_weight * std`
#[derive(Debug, Clone, Copy)]
pub struct BaselineScorer {
    pub intercept: f64,
    pub drop_weight: f64,
    pub std_weight: f64,
}

impl Default for BaselineScorer {
    fn default() -> Self {
        Self {
            intercept: -2.5,
            drop_weight: 12.0,
            std_weight: -1.5,
        }
    }
}

impl Classifier for BaselineScorer {
    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError> {
        if row.len() != BASELINE_FEATURES.len() {
            return Err(InferenceError::InvalidInputShape {
                expected: BASELINE_FEATURES.len(),
                actual: row.len(),
            });
        }
        let logit = self.intercept + self.drop_weight * row[0] + self.std_weight * row[1];
        Ok(sigmoid(logit))
    }

    fn name(&self) -> &str {
        "baseline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_curve_is_unlikely() {
        let p = BaselineScorer::default().predict_proba(&[0.0, 0.0]).unwrap();
        assert!((p - sigmoid(-2.5)).abs() < 1e-12);
        assert!(p < 0.1);
    }

    #[test]
    fn test_deep_dip_is_likely() {
        let p = BaselineScorer::default().predict_proba(&[0.5, 0.01]).unwrap();
        assert!(p > 0.95);
    }

    #[test]
    fn test_wrong_row_length() {
        assert!(matches!(
            BaselineScorer::default().predict_proba(&[0.1]),
            Err(InferenceError::InvalidInputShape { expected: 2, actual: 1 })
        ));
    }
}
