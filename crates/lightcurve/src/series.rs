//! Flux Series

use crate::error::InputError;

/// Minutes in one day, used to express cadence in days.
pub const MINUTES_PER_DAY: f64 = 60.0 * 24.0;

/// Brightness measurements paired by position with timestamps (days).
///
/// Flux values may be non-finite; use [`FluxSeries::finite`] to obtain the
/// filtered series before computing statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxSeries {
    time: Vec<f64>,
    flux: Vec<f64>,
}

impl FluxSeries {
    /// Pair explicit timestamps with flux values.
    ///
    /// Timestamps that are finite must be strictly increasing.
    pub fn new(time: Vec<f64>, flux: Vec<f64>) -> Result<Self, InputError> {
        if time.len() != flux.len() {
            return Err(InputError::LengthMismatch {
                time: time.len(),
                flux: flux.len(),
            });
        }

        let mut last: Option<f64> = None;
        for (i, &t) in time.iter().enumerate() {
            if !t.is_finite() {
                continue;
            }
            if let Some(prev) = last {
                if t <= prev {
                    return Err(InputError::NonMonotonicTime(i));
                }
            }
            last = Some(t);
        }

        Ok(Self { time, flux })
    }

    /// Derive evenly spaced timestamps from a fixed cadence.
    ///
    /// Point `i` sits at `i * cadence_minutes / 1440` days.
    pub fn from_cadence(flux: Vec<f64>, cadence_minutes: f64) -> Result<Self, InputError> {
        if !cadence_minutes.is_finite() || cadence_minutes <= 0.0 {
            return Err(InputError::InvalidCadence(cadence_minutes));
        }
        let step = cadence_minutes / MINUTES_PER_DAY;
        let time = (0..flux.len()).map(|i| i as f64 * step).collect();
        Ok(Self { time, flux })
    }

    /// Keep only positions where both time and flux are finite.
    pub fn finite(&self) -> FluxSeries {
        let (time, flux) = self
            .time
            .iter()
            .zip(&self.flux)
            .filter(|(t, f)| t.is_finite() && f.is_finite())
            .map(|(&t, &f)| (t, f))
            .unzip();
        FluxSeries { time, flux }
    }

    /// Timestamps in days
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Flux values
    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.flux.len()
    }

    /// Whether the series has no points
    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    /// Time covered from first to last sample (days), 0 for fewer than 2 points
    pub fn baseline(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_cadence_spacing() {
        let series = FluxSeries::from_cadence(vec![1.0; 4], 2.0).unwrap();
        let step = 2.0 / 1440.0;
        assert_eq!(series.time(), &[0.0, step, 2.0 * step, 3.0 * step]);
    }

    #[test]
    fn test_invalid_cadence() {
        assert_eq!(
            FluxSeries::from_cadence(vec![1.0], 0.0),
            Err(InputError::InvalidCadence(0.0))
        );
        assert!(FluxSeries::from_cadence(vec![1.0], f64::NAN).is_err());
        assert!(FluxSeries::from_cadence(vec![1.0], -2.0).is_err());
    }

    #[test]
    fn test_finite_applies_same_mask() {
        let series = FluxSeries::new(
            vec![0.0, 1.0, f64::NAN, 3.0, 4.0],
            vec![1.0, f64::INFINITY, 0.9, 1.1, f64::NAN],
        )
        .unwrap();

        let filtered = series.finite();
        assert_eq!(filtered.time(), &[0.0, 3.0]);
        assert_eq!(filtered.flux(), &[1.0, 1.1]);
    }

    #[test]
    fn test_length_mismatch() {
        let err = FluxSeries::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert_eq!(err, InputError::LengthMismatch { time: 2, flux: 1 });
    }

    #[test]
    fn test_non_monotonic_time() {
        let err = FluxSeries::new(vec![0.0, 2.0, f64::NAN, 1.0], vec![1.0; 4]).unwrap_err();
        assert_eq!(err, InputError::NonMonotonicTime(3));
    }

    #[test]
    fn test_baseline() {
        let series = FluxSeries::from_cadence(vec![1.0; 721], 2.0).unwrap();
        assert!((series.baseline() - 1.0).abs() < 1e-12);
        assert_eq!(FluxSeries::default().baseline(), 0.0);
    }

    fn flux_value() -> impl Strategy<Value = f64> {
        prop_oneof![
            8 => -10.0f64..10.0,
            1 => Just(f64::NAN),
            1 => Just(f64::INFINITY),
        ]
    }

    proptest! {
        #[test]
        fn prop_finite_drops_exactly_non_finite(flux in prop::collection::vec(flux_value(), 0..64)) {
            let series = FluxSeries::from_cadence(flux.clone(), 2.0).unwrap();
            let filtered = series.finite();

            let kept: Vec<usize> = (0..flux.len()).filter(|&i| flux[i].is_finite()).collect();
            let expected_flux: Vec<f64> = kept.iter().map(|&i| flux[i]).collect();
            let expected_time: Vec<f64> = kept.iter().map(|&i| series.time()[i]).collect();

            prop_assert_eq!(filtered.flux(), expected_flux.as_slice());
            prop_assert_eq!(filtered.time(), expected_time.as_slice());
        }
    }
}
