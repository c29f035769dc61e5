//! Engle-Granger two-step co-integration test.
//!
//! Step one regresses `y` on `x` with a constant. Step two runs an augmented
//! Dickey-Fuller regression without deterministic terms on the residuals:
//!
//! `d(e_t) = rho * e_{t-1} + sum_{j=1..p} phi_j * d(e_{t-j}) + u_t`
//!
//! The t-statistic of `rho` is compared against MacKinnon's response-surface
//! distribution for the constant-only, two-variable case.
//!
//! When `y` is an exact affine function of `x` the residuals vanish and the
//! regression cannot be fitted; the test then reports a statistic of
//! negative infinity and a p-value of 0.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

use super::regression::{least_squares, simple_ols, LeastSquares, OlsFit};
use super::StatisticsProvider;
use crate::error::PairsError;
use crate::PairsResult;

// ---------------------------------------------------------------------------
// MacKinnon tables (constant, N = 2 variables)
// ---------------------------------------------------------------------------

/// Above this statistic the p-value is 1.
const TAU_MAX: f64 = 0.92;
/// Below this statistic the p-value is 0.
const TAU_MIN: f64 = -18.86;
/// Switch point between the small-p and large-p polynomials.
const TAU_STAR: f64 = -2.62;
/// Ascending powers of tau, MacKinnon (1994).
const TAU_SMALL_P: [f64; 3] = [2.92, 1.5012, 0.039796];
const TAU_LARGE_P: [f64; 4] = [2.1945, 0.64695, -0.29198, -0.042377];

/// MacKinnon (2010) critical value surfaces: `b0 + b1/T + b2/T^2 + b3/T^3`.
const CRIT_1PCT: [f64; 4] = [-3.89644, -10.9519, -33.527, 0.0];
const CRIT_5PCT: [f64; 4] = [-3.33613, -6.1101, -6.823, 0.0];
const CRIT_10PCT: [f64; 4] = [-3.04445, -4.2412, -2.720, 0.0];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How many lagged differences enter the Dickey-Fuller regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum LagSelection {
    /// Use exactly this many lags.
    Fixed { lags: usize },
    /// Minimise AIC over `0..=max_lags`. `None` uses `ceil(12 * (n/100)^0.25)`.
    Aic { max_lags: Option<usize> },
}

impl Default for LagSelection {
    fn default() -> Self {
        LagSelection::Aic { max_lags: None }
    }
}

/// MacKinnon critical values for the test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Outcome of the co-integration test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationTest {
    /// t-statistic of the residual autoregression coefficient
    pub test_statistic: f64,
    /// Approximate asymptotic p-value
    pub p_value: f64,
    pub critical_values: CriticalValues,
    /// Lagged differences in the final regression
    pub lags_used: usize,
    /// Length of the input series
    pub observations: usize,
}

impl CointegrationTest {
    /// True when the no-co-integration null is rejected at `significance`.
    pub fn rejects_at(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Augmented Dickey-Fuller regression output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    pub statistic: f64,
    pub lags_used: usize,
    /// Rows in the final regression
    pub observations: usize,
}

/// Default statistics provider: OLS hedge regression and Engle-Granger test.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngleGranger {
    pub lag_selection: LagSelection,
}

impl EngleGranger {
    pub fn new(lag_selection: LagSelection) -> Self {
        Self { lag_selection }
    }
}

impl StatisticsProvider for EngleGranger {
    fn ols(&self, y: &[f64], x: &[f64]) -> PairsResult<OlsFit> {
        simple_ols(y, x)
    }

    fn cointegration(&self, y: &[f64], x: &[f64]) -> PairsResult<CointegrationTest> {
        let fit = simple_ols(y, x)?;
        let n = y.len();
        if fit.is_exact_fit() {
            warn!(r_squared = fit.r_squared, "series are collinear, residual ADF skipped");
            return Ok(CointegrationTest {
                test_statistic: f64::NEG_INFINITY,
                p_value: 0.0,
                critical_values: mackinnon_critical_values(n.saturating_sub(1)),
                lags_used: 0,
                observations: n,
            });
        }

        let residuals: Vec<f64> = y
            .iter()
            .zip(x)
            .map(|(yi, xi)| yi - fit.intercept - fit.slope * xi)
            .collect();

        let adf = adf_no_constant(&residuals, self.lag_selection)?;
        debug!(
            statistic = adf.statistic,
            lags = adf.lags_used,
            rows = adf.observations,
            "engle-granger residual ADF"
        );

        Ok(CointegrationTest {
            test_statistic: adf.statistic,
            p_value: mackinnon_p_value(adf.statistic)?,
            critical_values: mackinnon_critical_values(n.saturating_sub(1)),
            lags_used: adf.lags_used,
            observations: n,
        })
    }
}

// ---------------------------------------------------------------------------
// ADF regression
// ---------------------------------------------------------------------------

/// Augmented Dickey-Fuller t-statistic with no constant or trend.
pub fn adf_no_constant(series: &[f64], lag_selection: LagSelection) -> PairsResult<AdfResult> {
    let n = series.len();
    if n < 4 {
        return Err(PairsError::InsufficientData(format!(
            "ADF test needs at least 4 observations, got {n}"
        )));
    }
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let lags = match lag_selection {
        LagSelection::Fixed { lags } => {
            if lags + 2 > diffs.len() {
                return Err(PairsError::InvalidInput {
                    field: "lags".into(),
                    reason: format!("{lags} lags leave too few rows for {n} observations"),
                });
            }
            lags
        }
        LagSelection::Aic { max_lags } => {
            let cap = (n / 2).saturating_sub(1);
            let max_lags = max_lags.unwrap_or_else(|| default_max_lags(n)).min(cap);
            select_lags_by_aic(series, &diffs, max_lags)?
        }
    };

    let ls = adf_regression(series, &diffs, lags, lags)?;
    Ok(AdfResult {
        statistic: ls.t_stat(0),
        lags_used: lags,
        observations: ls.observations,
    })
}

/// `ceil(12 * (n / 100)^(1/4))`.
fn default_max_lags(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Fit every candidate on the rows valid for `max_lags` so the AIC values
/// share one sample.
fn select_lags_by_aic(series: &[f64], diffs: &[f64], max_lags: usize) -> PairsResult<usize> {
    let mut best: Option<(usize, f64)> = None;
    for lags in 0..=max_lags {
        let ls = match adf_regression(series, diffs, lags, max_lags) {
            Ok(ls) => ls,
            Err(PairsError::DivisionByZero { .. }) | Err(PairsError::InsufficientData(_)) => {
                continue
            }
            Err(e) => return Err(e),
        };
        let nobs = ls.observations as f64;
        let k = (lags + 1) as f64;
        let aic = nobs * (ls.ssr / nobs).ln() + 2.0 * k;
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lags, aic));
        }
    }
    best.map(|(lags, _)| lags).ok_or_else(|| PairsError::DivisionByZero {
        context: "ADF lag selection: no candidate lag order could be fitted".into(),
    })
}

/// Regress `diffs[t]` on `series[t]` and `lags` previous differences, using
/// rows `t >= start` where `start >= lags`.
fn adf_regression(
    series: &[f64],
    diffs: &[f64],
    lags: usize,
    start: usize,
) -> PairsResult<LeastSquares> {
    if start >= diffs.len() {
        return Err(PairsError::InsufficientData(format!(
            "{} differences leave no rows after {start} lags",
            diffs.len()
        )));
    }
    let rows: Vec<Vec<f64>> = (start..diffs.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lags + 1);
            row.push(series[t]);
            row.extend((1..=lags).map(|j| diffs[t - j]));
            row
        })
        .collect();
    let response = &diffs[start..];
    least_squares(&rows, response)
}

// ---------------------------------------------------------------------------
// MacKinnon approximations
// ---------------------------------------------------------------------------

/// Asymptotic p-value for the two-variable Engle-Granger statistic.
pub fn mackinnon_p_value(statistic: f64) -> PairsResult<f64> {
    if statistic.is_nan() {
        return Ok(f64::NAN);
    }
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }
    let poly = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    let normal = Normal::new(0.0, 1.0).map_err(|e| PairsError::InvalidInput {
        field: "normal".into(),
        reason: e.to_string(),
    })?;
    Ok(normal.cdf(poly))
}

/// Finite-sample critical values for a regression with `nobs` observations.
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let surface = |b: &[f64; 4]| {
        let t = nobs.max(1) as f64;
        b[0] + b[1] / t + b[2] / (t * t) + b[3] / (t * t * t)
    };
    CriticalValues {
        one_pct: surface(&CRIT_1PCT),
        five_pct: surface(&CRIT_5PCT),
        ten_pct: surface(&CRIT_10PCT),
    }
}

/// Evaluate a polynomial given in ascending powers.
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
