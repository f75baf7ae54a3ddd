//! Box Least-Squares Period Search
//!
//! Folds the light curve at a grid of trial periods, bins it in phase and
//! slides boxes of several widths over the binned curve looking for the
//! deepest dip. The periodogram peak gives period, duration and depth; its
//! prominence over the rest of the periodogram gives the SDE.

use crate::statistics::median;
use crate::transit::{TransitSearch, TransitSearchError, TransitStats};
use lightcurve::FluxSeries;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// BLS search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlsConfig {
    /// Shortest trial period (days)
    pub min_period_days: f64,
    /// Longest trial period (days); defaults to baseline / min_transits
    pub max_period_days: Option<f64>,
    /// Number of trial periods, spaced uniformly in frequency
    pub period_samples: usize,
    /// Phase bins per folded curve
    pub phase_bins: usize,
    /// Box widths as fractions of the period
    pub duration_fractions: Vec<f64>,
    /// Transits that must fit in the baseline at the longest period
    pub min_transits: usize,
}

impl Default for BlsConfig {
    fn default() -> Self {
        Self {
            min_period_days: 0.2,
            max_period_days: None,
            period_samples: 4000,
            phase_bins: 200,
            duration_fractions: vec![0.005, 0.01, 0.02, 0.04, 0.08],
            min_transits: 2,
        }
    }
}

/// Best box found at one trial period
#[derive(Debug, Clone, Copy)]
struct BoxFit {
    power: f64,
    start_bin: usize,
    width_bins: usize,
}

/// Box least-squares transit search
#[derive(Debug, Clone, Default)]
pub struct BoxLeastSquares {
    config: BlsConfig,
}

impl BoxLeastSquares {
    /// Create a search with the given configuration
    pub fn new(config: BlsConfig) -> Self {
        Self { config }
    }

    /// Trial periods (days), uniform in frequency, longest first
    fn period_grid(&self, baseline: f64) -> Result<Vec<f64>, TransitSearchError> {
        let min_period = self.config.min_period_days;
        let mut max_period = baseline / self.config.min_transits.max(1) as f64;
        if let Some(cap) = self.config.max_period_days {
            max_period = max_period.min(cap);
        }

        let searchable = min_period > 0.0 && max_period > min_period;
        if !searchable {
            return Err(TransitSearchError::InsufficientBaseline {
                baseline,
                min_period,
            });
        }

        let samples = self.config.period_samples.max(2);
        let f_min = 1.0 / max_period;
        let f_max = 1.0 / min_period;
        let step = (f_max - f_min) / (samples - 1) as f64;
        Ok((0..samples).map(|i| 1.0 / (f_min + step * i as f64)).collect())
    }

    /// Box widths in bins, deduplicated, each narrower than the full phase
    fn box_widths(&self) -> Vec<usize> {
        let bins = self.config.phase_bins;
        let mut widths: Vec<usize> = self
            .config
            .duration_fractions
            .iter()
            .filter(|q| q.is_finite() && **q > 0.0)
            .map(|q| ((q * bins as f64).round() as usize).max(1))
            .filter(|&w| w < bins)
            .collect();
        widths.sort_unstable();
        widths.dedup();
        widths
    }

    /// Phase bin of each sample when folded at `period` from `t_ref`
    fn fold(time: &[f64], t_ref: f64, period: f64, bins: usize) -> impl Iterator<Item = usize> + '_ {
        time.iter().map(move |&t| {
            let phase = ((t - t_ref) / period).rem_euclid(1.0);
            ((phase * bins as f64) as usize).min(bins - 1)
        })
    }

    fn best_box(&self, time: &[f64], residual: &[f64], t_ref: f64, period: f64, widths: &[usize]) -> Option<BoxFit> {
        let bins = self.config.phase_bins;
        let mut sums = vec![0.0; bins];
        let mut counts = vec![0usize; bins];
        for (bin, &y) in Self::fold(time, t_ref, period, bins).zip(residual) {
            sums[bin] += y;
            counts[bin] += 1;
        }

        let n = residual.len();
        let mut best: Option<BoxFit> = None;

        for &width in widths {
            let mut s: f64 = sums[..width].iter().sum();
            let mut r: usize = counts[..width].iter().sum();

            for start in 0..bins {
                if r > 0 && r < n && s < 0.0 {
                    let power = s * s * n as f64 / (r as f64 * (n - r) as f64);
                    if best.map_or(true, |b| power > b.power) {
                        best = Some(BoxFit {
                            power,
                            start_bin: start,
                            width_bins: width,
                        });
                    }
                }
                let next = (start + width) % bins;
                s += sums[next] - sums[start];
                r = r + counts[next] - counts[start];
            }
        }

        best
    }
}

impl TransitSearch for BoxLeastSquares {
    fn search(&self, series: &FluxSeries) -> Result<TransitStats, TransitSearchError> {
        let time = series.time();
        let flux = series.flux();
        let n = flux.len();
        if n < 3 || self.config.phase_bins < 2 {
            return Err(TransitSearchError::InsufficientData(n));
        }

        let periods = self.period_grid(series.baseline())?;
        let widths = self.box_widths();
        if widths.is_empty() {
            return Err(TransitSearchError::Numerical("no usable box widths".to_string()));
        }

        let center = median(flux);
        let scale = if center != 0.0 { center } else { 1.0 };
        let normalized: Vec<f64> = flux.iter().map(|f| f / scale).collect();
        let mean = normalized.iter().sum::<f64>() / n as f64;
        let residual: Vec<f64> = normalized.iter().map(|v| v - mean).collect();

        let t_ref = time[0];
        let fits: Vec<Option<BoxFit>> = periods
            .iter()
            .map(|&p| self.best_box(time, &residual, t_ref, p, &widths))
            .collect();

        let powers: Vec<f64> = fits.iter().map(|f| f.map_or(0.0, |b| b.power)).collect();
        let (peak_idx, peak) = fits
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.map(|b| (i, b)))
            .max_by(|a, b| a.1.power.total_cmp(&b.1.power))
            .ok_or(TransitSearchError::NoSignal)?;

        let k = powers.len() as f64;
        let power_mean = powers.iter().sum::<f64>() / k;
        let power_std = (powers.iter().map(|p| (p - power_mean).powi(2)).sum::<f64>() / k).sqrt();
        let sde = if power_std > 0.0 {
            (peak.power - power_mean) / power_std
        } else {
            0.0
        };

        let period = periods[peak_idx];
        let bins = self.config.phase_bins;
        let box_start = peak.start_bin as f64 / bins as f64;
        let box_width = peak.width_bins as f64 / bins as f64;

        let mut in_sum = 0.0;
        let mut out_values = Vec::with_capacity(n);
        let mut epochs: Vec<i64> = Vec::new();
        for (&t, &y) in time.iter().zip(&residual) {
            let cycles = (t - t_ref) / period - box_start;
            if cycles.rem_euclid(1.0) < box_width {
                in_sum += y;
                epochs.push(cycles.floor() as i64);
            } else {
                out_values.push(y);
            }
        }

        let n_in = epochs.len();
        if n_in == 0 || out_values.is_empty() {
            return Err(TransitSearchError::Numerical(
                "peak box has no in-transit or out-of-transit samples".to_string(),
            ));
        }
        epochs.dedup();

        let mean_in = in_sum / n_in as f64;
        let mean_out = out_values.iter().sum::<f64>() / out_values.len() as f64;
        let depth = mean_out - mean_in;
        let std_out = (out_values.iter().map(|v| (v - mean_out).powi(2)).sum::<f64>()
            / out_values.len() as f64)
            .sqrt();
        let snr = (std_out > 0.0).then(|| depth * (n_in as f64).sqrt() / std_out);

        debug!(
            period,
            sde,
            depth,
            transits = epochs.len(),
            "BLS peak found"
        );

        Ok(TransitStats {
            sde: Some(sde),
            period: Some(period),
            duration: Some(box_width * period),
            depth: Some(depth),
            snr,
            transit_count: Some(epochs.len() as f64),
        })
    }

    fn name(&self) -> &str {
        "bls"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic pseudo-noise in [-amplitude/2, amplitude/2)
    pub(crate) fn noise(i: usize, amplitude: f64) -> f64 {
        let x = ((i as f64 * 12.9898).sin() * 43758.5453).fract();
        (x.abs() - 0.5) * amplitude
    }

    /// 30-minute cadence light curve with a periodic box transit
    pub(crate) fn synthetic_transit(points: usize, period: f64, duration: f64, depth: f64) -> FluxSeries {
        synthetic_transit_at(30.0, points, period, duration, depth)
    }

    /// Light curve at `cadence_min` with a box transit first starting at 0.7 d
    pub(crate) fn synthetic_transit_at(
        cadence_min: f64,
        points: usize,
        period: f64,
        duration: f64,
        depth: f64,
    ) -> FluxSeries {
        let cadence_days = cadence_min / 1440.0;
        let time: Vec<f64> = (0..points).map(|i| i as f64 * cadence_days).collect();
        let flux = time
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let in_transit = (t - 0.7).rem_euclid(period) < duration;
                let base = if in_transit { 1.0 - depth } else { 1.0 };
                base + noise(i, 0.001)
            })
            .collect();
        FluxSeries::new(time, flux).unwrap()
    }

    #[test]
    fn test_recovers_injected_period() {
        let series = synthetic_transit(1500, 3.0, 0.15, 0.01);
        let stats = BoxLeastSquares::default().search(&series).unwrap();

        let period = stats.period.unwrap();
        assert!((period - 3.0).abs() / 3.0 < 0.03, "period {period}");

        let depth = stats.depth.unwrap();
        assert!(depth > 0.005 && depth < 0.015, "depth {depth}");

        let count = stats.transit_count.unwrap();
        assert!((9.0..=11.0).contains(&count), "transit count {count}");

        assert!(stats.sde.unwrap() > 3.0);
        assert!(stats.snr.unwrap() > 0.0);
    }

    #[test]
    fn test_too_few_points() {
        let series = FluxSeries::new(vec![0.0, 1.0], vec![1.0, 0.9]).unwrap();
        assert!(matches!(
            BoxLeastSquares::default().search(&series),
            Err(TransitSearchError::InsufficientData(2))
        ));
    }

    #[test]
    fn test_short_baseline() {
        let series = FluxSeries::from_cadence(vec![1.0, 0.99, 1.0, 1.01, 1.0], 2.0).unwrap();
        assert!(matches!(
            BoxLeastSquares::default().search(&series),
            Err(TransitSearchError::InsufficientBaseline { .. })
        ));
    }

    #[test]
    fn test_flat_curve_has_no_signal() {
        let series = FluxSeries::from_cadence(vec![1.0; 500], 30.0).unwrap();
        assert!(matches!(
            BoxLeastSquares::default().search(&series),
            Err(TransitSearchError::NoSignal)
        ));
    }

    #[test]
    fn test_period_grid_bounds() {
        let bls = BoxLeastSquares::new(BlsConfig {
            period_samples: 10,
            max_period_days: Some(4.0),
            ..Default::default()
        });
        let grid = bls.period_grid(20.0).unwrap();
        assert_eq!(grid.len(), 10);
        assert!((grid[0] - 4.0).abs() < 1e-9);
        assert!((grid[9] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_short_period_at_two_minute_cadence() {
        // 600 points at 2 min cover 0.83 d: three transits of a 0.25 d orbit
        let series = synthetic_transit_at(2.0, 600, 0.25, 0.02, 0.01);
        let stats = BoxLeastSquares::default().search(&series).unwrap();

        let period = stats.period.unwrap();
        assert!((period - 0.25).abs() / 0.25 < 0.05, "period {period}");
        assert!(stats.sde.unwrap() > 0.0);
        assert!(stats.depth.unwrap() > 0.005);
        assert!(stats.transit_count.unwrap() >= 2.0);
    }

    #[test]
    fn test_box_widths_dedup() {
        let bls = BoxLeastSquares::new(BlsConfig {
            phase_bins: 10,
            duration_fractions: vec![0.01, 0.02, 0.1, 2.0, f64::NAN],
            ..Default::default()
        });
        assert_eq!(bls.box_widths(), vec![1]);
    }
}
