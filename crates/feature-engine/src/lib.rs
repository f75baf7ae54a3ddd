//! Feature Engineering Engine
//!
//! Turns a light curve into the named feature vector the transit classifier
//! expects: median-normalized descriptive statistics plus period-search
//! statistics from a pluggable [`TransitSearch`].

mod bls;
mod features;
mod statistics;
mod transit;

pub use bls::{BlsConfig, BoxLeastSquares};
pub use features::{
    ExtractorConfig, FeatureExtractor, FeatureVector, TransitSearchKind, DEFAULT_MIN_TRANSIT_POINTS,
    FEATURE_NAMES,
};
pub use statistics::{median, BasicStatistics};
pub use transit::{NoTransitSearch, TransitSearch, TransitSearchError, TransitStats};
