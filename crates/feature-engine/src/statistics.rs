//! Basic Light Curve Statistics

use serde::{Deserialize, Serialize};

/// Minimum number of points for a lag-1 autocorrelation
const ACF_MIN_POINTS: usize = 3;

/// Descriptive statistics of a median-normalized flux series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStatistics {
    /// Population standard deviation
    pub std: f64,
    /// Median absolute deviation from the median
    pub mad: f64,
    /// Depth of the deepest dip below 1.0, never negative
    pub max_drop: f64,
    /// Lag-1 autocorrelation
    pub acf1: f64,
}

impl BasicStatistics {
    /// Compute statistics from already-filtered (finite) flux values.
    ///
    /// Flux is divided by its median first unless the median is exactly zero.
    pub fn compute(flux: &[f64]) -> Self {
        if flux.is_empty() {
            return Self::default();
        }

        let normalized = normalize_by_median(flux);
        let n = normalized.len() as f64;

        let mean = normalized.iter().sum::<f64>() / n;
        let variance = normalized.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let center = median(&normalized);
        let deviations: Vec<f64> = normalized.iter().map(|v| (v - center).abs()).collect();

        let min = normalized.iter().copied().fold(f64::INFINITY, f64::min);

        let acf1 = if normalized.len() >= ACF_MIN_POINTS {
            let r = pearson(&normalized[..normalized.len() - 1], &normalized[1..]);
            if r.is_finite() {
                r.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        } else {
            0.0
        };

        Self {
            std: variance.sqrt(),
            mad: median(&deviations),
            max_drop: (1.0 - min).max(0.0),
            acf1,
        }
    }
}

/// Divide by the median, or return a copy when the median is zero
pub fn normalize_by_median(flux: &[f64]) -> Vec<f64> {
    let m = median(flux);
    if m != 0.0 {
        flux.iter().map(|v| v / m).collect()
    } else {
        flux.to_vec()
    }
}

/// Median, averaging the two middle values for even lengths. 0.0 when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Pearson correlation; NaN when either side has zero variance
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    cov / (var_a * var_b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_values() {
        assert_eq!(BasicStatistics::compute(&[]), BasicStatistics::default());
    }

    #[test]
    fn test_constant_series() {
        let stats = BasicStatistics::compute(&[1.0; 10]);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.mad, 0.0);
        assert_eq!(stats.max_drop, 0.0);
        // zero variance makes the correlation undefined
        assert_eq!(stats.acf1, 0.0);
    }

    #[test]
    fn test_single_dip() {
        let stats = BasicStatistics::compute(&[100.0, 100.0, 90.0, 100.0, 100.0]);
        assert!((stats.max_drop - 0.1).abs() < 1e-12);
        assert_eq!(stats.mad, 0.0);
    }

    #[test]
    fn test_std_dev_is_normalized() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = BasicStatistics::compute(&values);
        // raw std is 2.0, median is 4.5
        assert!((stats.std - 2.0 / 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_median_skips_normalization() {
        let stats = BasicStatistics::compute(&[-1.0, 0.0, 1.0]);
        assert!((stats.max_drop - 2.0).abs() < 1e-12);
        assert!((stats.std - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_acf1_alternating_and_ramp() {
        let alternating = BasicStatistics::compute(&[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert!((alternating.acf1 + 1.0).abs() < 1e-9);

        let ramp = BasicStatistics::compute(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((ramp.acf1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_acf1_needs_three_points() {
        assert_eq!(BasicStatistics::compute(&[1.0, 2.0]).acf1, 0.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    proptest! {
        #[test]
        fn prop_max_drop_non_negative(flux in prop::collection::vec(-10.0f64..10.0, 0..200)) {
            let stats = BasicStatistics::compute(&flux);
            prop_assert!(stats.max_drop >= 0.0);
        }

        #[test]
        fn prop_max_drop_zero_iff_min_at_or_above_one(flux in prop::collection::vec(0.5f64..1.5, 1..200)) {
            let stats = BasicStatistics::compute(&flux);
            let min = normalize_by_median(&flux).into_iter().fold(f64::INFINITY, f64::min);
            prop_assert_eq!(stats.max_drop == 0.0, min >= 1.0);
        }

        #[test]
        fn prop_acf1_bounded(flux in prop::collection::vec(0.0f64..2.0, 0..200)) {
            let stats = BasicStatistics::compute(&flux);
            prop_assert!((-1.0..=1.0).contains(&stats.acf1));
            if flux.len() < 3 {
                prop_assert_eq!(stats.acf1, 0.0);
            }
        }

        #[test]
        fn prop_all_finite(flux in prop::collection::vec(-1e6f64..1e6, 0..200)) {
            let stats = BasicStatistics::compute(&flux);
            prop_assert!(stats.std.is_finite());
            prop_assert!(stats.mad.is_finite());
            prop_assert!(stats.max_drop.is_finite());
            prop_assert!(stats.acf1.is_finite());
        }
    }
}
