use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::stats;
use crate::PairsResult;

/// Full-sample standardisation of a spread series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    pub values: Vec<f64>,
    /// Mean of the spread
    pub mean: f64,
    /// Sample standard deviation of the spread
    pub std_dev: f64,
}

/// Distribution of the z-score series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ZScore {
    /// True when the spread had zero or undefined dispersion, in which case
    /// every value is NaN.
    pub fn is_degenerate(&self) -> bool {
        !(self.std_dev.is_finite() && self.std_dev > 0.0)
    }

    /// Degenerate z-score for a spread known to be constant up to rounding,
    /// where the measured dispersion is numerical noise.
    pub fn undefined(spread: &[f64]) -> Self {
        Self {
            values: vec![f64::NAN; spread.len()],
            mean: stats::mean(spread),
            std_dev: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn summary(&self) -> ZScoreSummary {
        let (min, max) = if self.is_degenerate() || self.values.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            self.values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &z| {
                    (lo.min(z), hi.max(z))
                })
        };
        ZScoreSummary {
            mean: stats::mean(&self.values),
            std_dev: stats::sample_std_dev(&self.values),
            min,
            max,
        }
    }
}

/// `price_a[i] - hedge_ratio * price_b[i]` for every bar.
pub fn build_spread(prices_a: &[f64], prices_b: &[f64], hedge_ratio: f64) -> PairsResult<Vec<f64>> {
    if prices_a.is_empty() {
        return Err(PairsError::InsufficientData(
            "spread needs at least one price".into(),
        ));
    }
    if prices_a.len() != prices_b.len() {
        return Err(PairsError::InputMismatch(format!(
            "asset A has {} prices but asset B has {}",
            prices_a.len(),
            prices_b.len()
        )));
    }
    if !hedge_ratio.is_finite() {
        return Err(PairsError::InvalidInput {
            field: "hedge_ratio".into(),
            reason: format!("hedge ratio must be finite, got {hedge_ratio}"),
        });
    }

    Ok(prices_a
        .iter()
        .zip(prices_b)
        .map(|(a, b)| a - hedge_ratio * b)
        .collect())
}

/// Standardise `spread` with its own mean and sample standard deviation.
///
/// A constant spread (or one with fewer than two points) yields a degenerate
/// z-score of all NaN; callers check [`ZScore::is_degenerate`].
pub fn z_score(spread: &[f64]) -> ZScore {
    let mean = stats::mean(spread);
    let std_dev = stats::sample_std_dev(spread);

    let values = if std_dev.is_finite() && std_dev > 0.0 {
        spread.iter().map(|s| (s - mean) / std_dev).collect()
    } else {
        vec![f64::NAN; spread.len()]
    };

    ZScore {
        values,
        mean,
        std_dev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_is_degenerate() {
        let z = ZScore::undefined(&[3.0, 3.0 + 1e-14, 3.0 - 1e-14]);
        assert!(z.is_degenerate());
        assert!(z.values.iter().all(|v| v.is_nan()));
        assert!((z.mean - 3.0).abs() < 1e-12);
        assert!(z.summary().min.is_nan());
    }

    #[test]
    fn test_build_spread_elementwise() {
        let spread = build_spread(&[10.0, 12.0, 11.0], &[4.0, 5.0, 6.0], 2.0).unwrap();
        assert_eq!(spread, vec![2.0, 2.0, -1.0]);
    }

    #[test]
    fn test_build_spread_length_mismatch() {
        let err = build_spread(&[1.0, 2.0], &[1.0], 1.0).unwrap_err();
        assert!(matches!(err, PairsError::InputMismatch(_)));
    }

    #[test]
    fn test_build_spread_empty() {
        assert!(build_spread(&[], &[], 1.0).is_err());
    }

    #[test]
    fn test_build_spread_non_finite_hedge() {
        assert!(matches!(
            build_spread(&[1.0], &[1.0], f64::NAN),
            Err(PairsError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_z_score_is_standardised() {
        let spread = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0, 3.0];
        let z = z_score(&spread);
        assert!(!z.is_degenerate());
        assert_eq!(z.len(), spread.len());
        let summary = z.summary();
        assert!(summary.mean.abs() < 1e-12);
        assert!((summary.std_dev - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_z_score_uses_sample_std() {
        let z = z_score(&[0.0, 2.0]);
        // mean 1, sample std sqrt(2)
        assert!((z.values[1] - 1.0 / 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_z_score_constant_spread_is_degenerate() {
        let z = z_score(&[3.0; 6]);
        assert!(z.is_degenerate());
        assert_eq!(z.std_dev, 0.0);
        assert!(z.values.iter().all(|v| v.is_nan()));
        assert!(z.summary().min.is_nan());
    }

    #[test]
    fn test_z_score_single_point_is_degenerate() {
        let z = z_score(&[1.0]);
        assert!(z.is_degenerate());
        assert_eq!(z.len(), 1);
    }

    #[test]
    fn test_summary_min_max() {
        let z = z_score(&[0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0]);
        let s = z.summary();
        assert!(s.min < 0.0 && s.max > 0.0);
        assert_eq!(s.max, z.values[3]);
        assert_eq!(s.min, z.values[0]);
    }
}
