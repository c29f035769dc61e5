pub mod cointegration;
pub mod regression;

use statrs::statistics::Statistics;

pub use cointegration::{CointegrationTest, CriticalValues, EngleGranger, LagSelection};
pub use regression::OlsFit;

use crate::PairsResult;

/// Numeric primitives the backtest needs from a statistics library.
///
/// Both methods take `y` as the dependent series and `x` as the regressor.
pub trait StatisticsProvider {
    /// Ordinary least squares of `y` on `x` with an intercept.
    fn ols(&self, y: &[f64], x: &[f64]) -> PairsResult<OlsFit>;

    /// Co-integration test of `y` against `x`.
    fn cointegration(&self, y: &[f64], x: &[f64]) -> PairsResult<CointegrationTest>;
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Sample (N-1) standard deviation; NaN for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    values.iter().std_dev()
}

/// Pearson correlation; NaN when either series has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = mean(&x[..n]);
    let mean_y = mean(&y[..n]);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    cov / denom
}

/// Mean-reversion half-life from an AR(1) fit `s_t = c + phi * s_{t-1}`.
///
/// `None` unless `0 < phi < 1`.
pub fn half_life(series: &[f64]) -> Option<f64> {
    if series.len() < 4 {
        return None;
    }
    let lagged = &series[..series.len() - 1];
    let current = &series[1..];
    let phi = regression::simple_ols(current, lagged).ok()?.slope;
    if phi <= 0.0 || phi >= 1.0 {
        return None;
    }
    Some(-std::f64::consts::LN_2 / phi.ln())
}
