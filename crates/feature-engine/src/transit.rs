//! Transit Search Interface
//!
//! The period search is a black box from the extractor's point of view: any
//! error it returns is treated as "no transit signal found".

use lightcurve::FluxSeries;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a transit search implementation
#[derive(Debug, Clone, Error)]
pub enum TransitSearchError {
    #[error("Not enough points for a period search: {0}")]
    InsufficientData(usize),
    #[error("Time baseline {baseline:.4} days too short for periods above {min_period:.4} days")]
    InsufficientBaseline { baseline: f64, min_period: f64 },
    #[error("No transit-like dip found")]
    NoSignal,
    #[error("Numerical failure: {0}")]
    Numerical(String),
}

impl TransitSearchError {
    /// Whether the data simply cannot support a search, as opposed to the
    /// search itself misbehaving
    pub fn is_data_limit(&self) -> bool {
        !matches!(self, TransitSearchError::Numerical(_))
    }
}

/// Raw statistics reported by a period search.
///
/// Fields are optional; the extractor coerces missing or non-finite values
/// to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitStats {
    /// Signal detection efficiency of the best period
    pub sde: Option<f64>,
    /// Best period (days)
    pub period: Option<f64>,
    /// Transit duration (days)
    pub duration: Option<f64>,
    /// Fractional transit depth
    pub depth: Option<f64>,
    /// Signal-to-noise ratio of the transit
    pub snr: Option<f64>,
    /// Number of transits covered by data
    pub transit_count: Option<f64>,
}

/// A period search over a light curve
pub trait TransitSearch: Send + Sync {
    /// Search the (finite, time-ordered) series for a periodic dip
    fn search(&self, series: &FluxSeries) -> Result<TransitStats, TransitSearchError>;

    /// Implementation name for logs
    fn name(&self) -> &str;
}

/// Search that never finds anything; disables transit features
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransitSearch;

impl TransitSearch for NoTransitSearch {
    fn search(&self, _series: &FluxSeries) -> Result<TransitStats, TransitSearchError> {
        Err(TransitSearchError::NoSignal)
    }

    fn name(&self) -> &str {
        "none"
    }
}
