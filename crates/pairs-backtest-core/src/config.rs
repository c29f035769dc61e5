use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::pairs::performance::TRADING_DAYS_PER_YEAR;
use crate::pairs::simulator::Thresholds;
use crate::stats::LagSelection;
use crate::PairsResult;

/// Parameters of one backtest run. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// |z| above which a position is opened (default 2.0)
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,
    /// |z| below which the position is closed (default 0.2)
    #[serde(default = "default_exit_threshold")]
    pub exit_threshold: f64,
    /// Annualisation factor for the Sharpe ratio (default 252)
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    /// Lag choice for the residual Dickey-Fuller regression
    #[serde(default)]
    pub lag_selection: LagSelection,
    /// p-value below which the pair is reported as co-integrated (default 0.05)
    #[serde(default = "default_significance")]
    pub significance: f64,
}

fn default_entry_threshold() -> f64 {
    2.0
}

fn default_exit_threshold() -> f64 {
    0.2
}

fn default_periods_per_year() -> f64 {
    TRADING_DAYS_PER_YEAR
}

fn default_significance() -> f64 {
    0.05
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            entry_threshold: default_entry_threshold(),
            exit_threshold: default_exit_threshold(),
            periods_per_year: default_periods_per_year(),
            lag_selection: LagSelection::default(),
            significance: default_significance(),
        }
    }
}

impl BacktestConfig {
    pub fn thresholds(&self) -> PairsResult<Thresholds> {
        Thresholds::new(self.entry_threshold, self.exit_threshold)
    }

    pub fn validate(&self) -> PairsResult<()> {
        self.thresholds()?;
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(PairsError::InvalidInput {
                field: "periods_per_year".into(),
                reason: "Periods per year must be positive".into(),
            });
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(PairsError::InvalidInput {
                field: "significance".into(),
                reason: "Significance must lie strictly between 0 and 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.entry_threshold, 2.0);
        assert_eq!(config.exit_threshold, 0.2);
        assert_eq!(config.periods_per_year, 252.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BacktestConfig = serde_json::from_str(r#"{"entry_threshold": 1.5}"#).unwrap();
        assert_eq!(config.entry_threshold, 1.5);
        assert_eq!(config.exit_threshold, 0.2);
        assert_eq!(config.lag_selection, LagSelection::Aic { max_lags: None });
    }

    #[test]
    fn test_invalid_periods() {
        let config = BacktestConfig {
            periods_per_year: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_significance() {
        let config = BacktestConfig {
            significance: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_threshold() {
        let config = BacktestConfig {
            exit_threshold: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
