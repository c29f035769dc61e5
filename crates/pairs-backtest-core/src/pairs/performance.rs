use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::stats;
use crate::PairsResult;

/// Trading days per year used to annualise daily returns.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// A metric that could not be computed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndefinedMetric {
    pub metric: String,
    pub reason: String,
}

impl UndefinedMetric {
    fn new(metric: &str, reason: impl Into<String>) -> Self {
        Self {
            metric: metric.to_string(),
            reason: reason.into(),
        }
    }
}

/// Risk and return statistics of a return series.
///
/// Undefined metrics hold NaN (serialised as `null`) and are listed in
/// `undefined_metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Annualised mean / sample standard deviation of returns
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough fall of cumulative PnL, in spread units
    pub max_drawdown: f64,
    /// Running sum of returns
    pub cumulative_pnl: Vec<f64>,
    /// Distance below the running peak of cumulative PnL
    pub drawdown: Vec<f64>,
    pub total_pnl: f64,
    pub mean_return: f64,
    pub return_std_dev: f64,
    pub periods: usize,
    pub periods_per_year: f64,
    pub undefined_metrics: Vec<UndefinedMetric>,
}

impl PerformanceSummary {
    pub fn is_defined(&self, metric: &str) -> bool {
        !self.undefined_metrics.iter().any(|m| m.metric == metric)
    }
}

/// Compute Sharpe ratio, cumulative PnL and drawdown for `returns`.
pub fn evaluate(returns: &[f64], periods_per_year: f64) -> PairsResult<PerformanceSummary> {
    if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
        return Err(PairsError::InvalidInput {
            field: "periods_per_year".into(),
            reason: format!("must be a positive number, got {periods_per_year}"),
        });
    }

    let mut undefined_metrics = Vec::new();

    let cumulative_pnl: Vec<f64> = returns
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect();

    let mut peak = f64::NEG_INFINITY;
    let drawdown: Vec<f64> = cumulative_pnl
        .iter()
        .map(|&c| {
            peak = peak.max(c);
            peak - c
        })
        .collect();

    let non_finite = returns.iter().filter(|r| !r.is_finite()).count();
    let max_drawdown = if non_finite > 0 {
        undefined_metrics.push(UndefinedMetric::new(
            "max_drawdown",
            format!("{non_finite} returns are not finite"),
        ));
        f64::NAN
    } else {
        drawdown.iter().copied().fold(0.0, f64::max)
    };

    let mean_return = stats::mean(returns);
    let return_std_dev = stats::sample_std_dev(returns);

    let sharpe_ratio = if non_finite > 0 {
        undefined_metrics.push(UndefinedMetric::new(
            "sharpe_ratio",
            format!("{non_finite} returns are not finite"),
        ));
        f64::NAN
    } else if returns.len() < 2 {
        undefined_metrics.push(UndefinedMetric::new(
            "sharpe_ratio",
            "fewer than two returns",
        ));
        f64::NAN
    } else if return_std_dev == 0.0 {
        undefined_metrics.push(UndefinedMetric::new(
            "sharpe_ratio",
            "returns have zero standard deviation",
        ));
        f64::NAN
    } else {
        mean_return / return_std_dev * periods_per_year.sqrt()
    };

    Ok(PerformanceSummary {
        sharpe_ratio,
        max_drawdown,
        total_pnl: cumulative_pnl.last().copied().unwrap_or(0.0),
        cumulative_pnl,
        drawdown,
        mean_return,
        return_std_dev,
        periods: returns.len(),
        periods_per_year,
        undefined_metrics,
    })
}
