//! Input Error Types

use thiserror::Error;

/// Errors caused by caller-supplied light curve data.
///
/// Always recoverable at the request boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Fewer points than the configured minimum
    #[error("Not enough data points: got {got}, need at least {min}")]
    TooShort { got: usize, min: usize },

    /// Upload or text body had no content
    #[error("Input is empty")]
    EmptyInput,

    /// Text had tokens but none of them parsed as a number
    #[error("No numeric values found ({skipped} unparseable tokens). Use comma or whitespace separated floats")]
    NoNumericTokens { skipped: usize },

    /// Cadence must be a positive, finite number of minutes
    #[error("Invalid cadence: {0} minutes")]
    InvalidCadence(f64),

    /// Time and flux sequences differ in length
    #[error("Length mismatch: {time} timestamps for {flux} flux values")]
    LengthMismatch { time: usize, flux: usize },

    /// Finite timestamps must be strictly increasing
    #[error("Timestamps are not strictly increasing at index {0}")]
    NonMonotonicTime(usize),
}
