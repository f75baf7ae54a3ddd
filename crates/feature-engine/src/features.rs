//! Feature Vector Assembly

use crate::bls::{BlsConfig, BoxLeastSquares};
use crate::statistics::BasicStatistics;
use crate::transit::{NoTransitSearch, TransitSearch, TransitStats};
use lightcurve::coerce::{count_or, finite_or};
use lightcurve::FluxSeries;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Feature names in canonical order
pub const FEATURE_NAMES: [&str; 10] = [
    "std",
    "mad",
    "max_drop",
    "acf1",
    "tls_SDE",
    "tls_period",
    "tls_duration",
    "tls_depth",
    "tls_snr",
    "tls_transit_count",
];

/// Fewest finite points for which a period search is attempted
pub const DEFAULT_MIN_TRANSIT_POINTS: usize = 400;

/// Named features computed from one light curve.
///
/// Every value is finite. Transit fields are zero when the search was
/// skipped or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub std: f64,
    pub mad: f64,
    pub max_drop: f64,
    pub acf1: f64,
    #[serde(rename = "tls_SDE")]
    pub tls_sde: f64,
    pub tls_period: f64,
    pub tls_duration: f64,
    pub tls_depth: f64,
    pub tls_snr: f64,
    pub tls_transit_count: u32,
}

impl FeatureVector {
    /// Look a feature up by its wire name
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "std" => self.std,
            "mad" => self.mad,
            "max_drop" => self.max_drop,
            "acf1" => self.acf1,
            "tls_SDE" => self.tls_sde,
            "tls_period" => self.tls_period,
            "tls_duration" => self.tls_duration,
            "tls_depth" => self.tls_depth,
            "tls_snr" => self.tls_snr,
            "tls_transit_count" => self.tls_transit_count as f64,
            _ => return None,
        };
        Some(value)
    }

    /// Iterate over (name, value) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .filter_map(move |&name| self.get(name).map(|v| (name, v)))
    }

    fn from_basic(stats: BasicStatistics) -> Self {
        Self {
            std: finite_or(Some(stats.std), 0.0),
            mad: finite_or(Some(stats.mad), 0.0),
            max_drop: finite_or(Some(stats.max_drop), 0.0),
            acf1: finite_or(Some(stats.acf1), 0.0),
            ..Default::default()
        }
    }

    fn set_transit(&mut self, stats: &TransitStats) {
        self.tls_sde = finite_or(stats.sde, 0.0);
        self.tls_period = finite_or(stats.period, 0.0);
        self.tls_duration = finite_or(stats.duration, 0.0);
        self.tls_depth = finite_or(stats.depth, 0.0);
        self.tls_snr = finite_or(stats.snr, 0.0);
        self.tls_transit_count = count_or(stats.transit_count, 0);
    }
}

/// Which period search backs the transit features
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitSearchKind {
    /// Box least-squares search
    #[default]
    Bls,
    /// Transit features are always zero
    None,
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Fewest finite points for a period search
    pub min_transit_points: usize,
    /// Period search implementation
    pub transit_search: TransitSearchKind,
    /// BLS parameters
    pub bls: BlsConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_transit_points: DEFAULT_MIN_TRANSIT_POINTS,
            transit_search: TransitSearchKind::default(),
            bls: BlsConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Build the configured period search
    pub fn build_search(&self) -> Arc<dyn TransitSearch> {
        match self.transit_search {
            TransitSearchKind::Bls => Arc::new(BoxLeastSquares::new(self.bls.clone())),
            TransitSearchKind::None => Arc::new(NoTransitSearch),
        }
    }
}

/// Turns a light curve into a [`FeatureVector`]
#[derive(Clone)]
pub struct FeatureExtractor {
    /// Injected period search
    search: Arc<dyn TransitSearch>,
    /// Fewest finite points for a period search
    min_transit_points: usize,
}

impl FeatureExtractor {
    /// Create an extractor around a period search
    pub fn new(search: Arc<dyn TransitSearch>, min_transit_points: usize) -> Self {
        Self {
            search,
            min_transit_points,
        }
    }

    /// Create an extractor from configuration
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.build_search(), config.min_transit_points)
    }

    /// Name of the period search in use
    pub fn search_name(&self) -> &str {
        self.search.name()
    }

    /// Extract features. Never fails: non-finite points are dropped and
    /// transit-search problems degrade to zeroed transit features.
    pub fn extract(&self, series: &FluxSeries) -> FeatureVector {
        let filtered = series.finite();
        debug!(
            total = series.len(),
            finite = filtered.len(),
            "Extracting light curve features"
        );

        let mut features = FeatureVector::from_basic(BasicStatistics::compute(filtered.flux()));
        if let Some(stats) = self.transit_stats(&filtered) {
            features.set_transit(&stats);
        }
        features
    }

    fn transit_stats(&self, filtered: &FluxSeries) -> Option<TransitStats> {
        if filtered.len() < self.min_transit_points {
            debug!(
                points = filtered.len(),
                min = self.min_transit_points,
                "Skipping transit search"
            );
            return None;
        }

        let search = Arc::clone(&self.search);
        match panic::catch_unwind(AssertUnwindSafe(|| search.search(filtered))) {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(e)) if e.is_data_limit() => {
                debug!(search = search.name(), "No transit statistics: {}", e);
                None
            }
            Ok(Err(e)) => {
                warn!(search = search.name(), "Transit search failed: {}", e);
                None
            }
            Err(_) => {
                warn!(search = search.name(), "Transit search panicked");
                None
            }
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("search", &self.search.name())
            .field("min_transit_points", &self.min_transit_points)
            .finish()
    }
}
