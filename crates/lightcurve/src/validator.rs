//! Minimum-length gate for incoming light curves

use crate::error::InputError;
use crate::parser::parse_flux_text_report;
use serde::{Deserialize, Serialize};

/// Default minimum number of points accepted for prediction
pub const DEFAULT_MIN_POINTS: usize = 3;

/// Validates raw caller input before any features are computed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesValidator {
    /// Minimum number of values (counted before non-finite filtering)
    pub min_points: usize,
}

impl Default for SeriesValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_POINTS)
    }
}

impl SeriesValidator {
    /// Create a validator with the given minimum length
    pub fn new(min_points: usize) -> Self {
        Self { min_points }
    }

    /// Reject value sequences below the minimum length
    pub fn check_values(&self, values: &[f64]) -> Result<(), InputError> {
        if values.len() < self.min_points {
            return Err(InputError::TooShort {
                got: values.len(),
                min: self.min_points,
            });
        }
        Ok(())
    }

    /// Parse a text blob and apply the same gate to the parsed values
    pub fn check_text(&self, text: &str) -> Result<Vec<f64>, InputError> {
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Err(InputError::EmptyInput);
        }

        let parsed = parse_flux_text_report(text);
        if parsed.values.is_empty() {
            return Err(InputError::NoNumericTokens {
                skipped: parsed.skipped,
            });
        }

        self.check_values(&parsed.values)?;
        Ok(parsed.values)
    }
}
