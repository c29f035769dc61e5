use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use super::performance::{evaluate, PerformanceSummary};
use super::simulator::{simulate, Position, Signal};
use super::spread::{build_spread, z_score, ZScore, ZScoreSummary};
use super::trades::{assign_dates, extract_trades, trade_stats, PairTrade, TradeStats};
use crate::config::BacktestConfig;
use crate::error::PairsError;
use crate::stats::{
    half_life, pearson_correlation, CointegrationTest, EngleGranger, OlsFit, StatisticsProvider,
};
use crate::types::{with_metadata, AlignedPrices, ComputationOutput, PriceSeries};
use crate::PairsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a pairs backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestInput {
    /// Dependent leg; the spread is `A - hedge_ratio * B`
    pub asset_a: PriceSeries,
    /// Hedge leg
    pub asset_b: PriceSeries,
    #[serde(default)]
    pub config: BacktestConfig,
}

/// Identity of the traded pair, for labelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairLabel {
    pub asset_a: String,
    pub asset_b: String,
}

/// One bar of the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub spread: f64,
    pub z_score: f64,
    pub position: Position,
    #[serde(rename = "return")]
    pub ret: f64,
    pub cumulative_pnl: f64,
    pub drawdown: f64,
}

/// Everything a single backtest produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub pair: PairLabel,
    pub observations: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cointegration: CointegrationTest,
    pub is_cointegrated: bool,
    /// OLS of A on B with intercept
    pub hedge_regression: OlsFit,
    pub hedge_ratio: f64,
    pub correlation: f64,
    pub spread_mean: f64,
    pub spread_std_dev: f64,
    /// AR(1) half-life of the spread in bars, when it mean-reverts
    pub half_life: Option<f64>,
    pub z_score_summary: ZScoreSummary,
    pub current_z_score: f64,
    pub signal: Signal,
    pub performance: PerformanceSummary,
    pub trades: Vec<PairTrade>,
    pub trade_stats: TradeStats,
    /// Fraction of bars with a position
    pub exposure: f64,
    /// Position per bar from the second observation
    pub positions: Vec<Position>,
    /// Return per bar from the second observation
    pub returns: Vec<f64>,
    pub equity_curve: Vec<EquityPoint>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fewest aligned observations the co-integration regression is run on.
pub const MIN_OBSERVATIONS: usize = 20;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Backtest with the built-in Engle-Granger statistics.
pub fn run_backtest_default(
    input: &BacktestInput,
) -> PairsResult<ComputationOutput<BacktestReport>> {
    run_backtest(input, &EngleGranger::new(input.config.lag_selection))
}

/// Test the pair for co-integration, estimate the hedge ratio, build the
/// z-scored spread and run the threshold strategy over it.
pub fn run_backtest(
    input: &BacktestInput,
    provider: &impl StatisticsProvider,
) -> PairsResult<ComputationOutput<BacktestReport>> {
    let start = Instant::now();
    let span = info_span!(
        "backtest",
        asset_a = %input.asset_a.symbol,
        asset_b = %input.asset_b.symbol
    );
    let _guard = span.enter();
    let mut warnings: Vec<String> = Vec::new();

    // ------------------------------------------------------------------
    // 1. Validate inputs
    // ------------------------------------------------------------------
    let config = &input.config;
    config.validate()?;
    let thresholds = config.thresholds()?;

    let prices = AlignedPrices::align(&input.asset_a, &input.asset_b)?;
    let n = prices.len();
    if n < MIN_OBSERVATIONS {
        return Err(PairsError::InsufficientData(format!(
            "At least {MIN_OBSERVATIONS} aligned observations required, got {n}"
        )));
    }
    info!(observations = n, "aligned price series");

    // ------------------------------------------------------------------
    // 2. Co-integration test
    // ------------------------------------------------------------------
    let cointegration = provider.cointegration(&prices.prices_a, &prices.prices_b)?;
    let is_cointegrated = cointegration.rejects_at(config.significance);
    debug!(
        statistic = cointegration.test_statistic,
        p_value = cointegration.p_value,
        "co-integration test"
    );
    if !is_cointegrated {
        warnings.push(format!(
            "{} and {} are not co-integrated at {} (p-value {:.4}); mean reversion of the spread is not supported",
            prices.symbol_a, prices.symbol_b, config.significance, cointegration.p_value
        ));
    }

    // ------------------------------------------------------------------
    // 3. Hedge ratio: A regressed on B
    // ------------------------------------------------------------------
    let hedge_regression = provider.ols(&prices.prices_a, &prices.prices_b)?;
    let hedge_ratio = hedge_regression.slope;
    debug!(hedge_ratio, intercept = hedge_regression.intercept, "hedge regression");

    // ------------------------------------------------------------------
    // 4. Spread and z-score
    // ------------------------------------------------------------------
    let spread = build_spread(&prices.prices_a, &prices.prices_b, hedge_ratio)?;
    let z = if hedge_regression.is_exact_fit() {
        warn!(r_squared = hedge_regression.r_squared, "hedge regression is an exact fit");
        warnings.push(format!(
            "{} is an exact linear function of {}: the spread is constant up to rounding",
            prices.symbol_a, prices.symbol_b
        ));
        ZScore::undefined(&spread)
    } else {
        z_score(&spread)
    };
    if z.is_degenerate() {
        warn!("spread has zero standard deviation");
        warnings.push(
            "Spread has zero standard deviation: z-scores, signal and z-score summary are undefined and no positions are taken".into(),
        );
    }
    let current_z_score = z.last().unwrap_or(f64::NAN);

    // ------------------------------------------------------------------
    // 5. Simulation
    // ------------------------------------------------------------------
    let simulation = simulate(&spread, &z.values, thresholds)?;
    if !simulation.undefined_steps.is_empty() {
        warnings.push(format!(
            "{} bars produced non-finite returns",
            simulation.undefined_steps.len()
        ));
    }

    // ------------------------------------------------------------------
    // 6. Performance
    // ------------------------------------------------------------------
    let performance = evaluate(&simulation.returns, config.periods_per_year)?;
    for metric in &performance.undefined_metrics {
        warn!(metric = %metric.metric, reason = %metric.reason, "metric undefined");
        warnings.push(format!("{} is undefined: {}", metric.metric, metric.reason));
    }

    let mut trades = extract_trades(&simulation.positions, &simulation.returns, &z.values);
    assign_dates(&mut trades, &prices.dates);
    let stats = trade_stats(&trades);

    let equity_curve: Vec<EquityPoint> = (1..n)
        .map(|bar| {
            let k = bar - 1;
            EquityPoint {
                date: prices.dates[bar],
                spread: spread[bar],
                z_score: z.values[bar],
                position: simulation.positions[k],
                ret: simulation.returns[k],
                cumulative_pnl: performance.cumulative_pnl[k],
                drawdown: performance.drawdown[k],
            }
        })
        .collect();

    info!(
        sharpe = performance.sharpe_ratio,
        max_drawdown = performance.max_drawdown,
        trades = stats.trade_count,
        "backtest complete"
    );

    let report = BacktestReport {
        pair: PairLabel {
            asset_a: prices.symbol_a.clone(),
            asset_b: prices.symbol_b.clone(),
        },
        observations: n,
        start_date: prices.dates[0],
        end_date: prices.dates[n - 1],
        cointegration,
        is_cointegrated,
        hedge_regression,
        hedge_ratio,
        correlation: pearson_correlation(&prices.prices_a, &prices.prices_b),
        spread_mean: z.mean,
        spread_std_dev: z.std_dev,
        half_life: if z.is_degenerate() {
            None
        } else {
            half_life(&spread)
        },
        z_score_summary: z.summary(),
        current_z_score,
        signal: Signal::classify(current_z_score, &thresholds),
        exposure: simulation.exposure(),
        trade_stats: stats,
        trades,
        positions: simulation.positions,
        returns: simulation.returns,
        performance,
        equity_curve,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Engle-Granger co-integration, OLS hedge ratio, full-sample z-score, threshold long/short backtest",
        config,
        warnings,
        elapsed,
        report,
    ))
}
