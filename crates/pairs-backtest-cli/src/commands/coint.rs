use clap::Args;
use pairs_backtest_core::pairs::build_spread;
use pairs_backtest_core::stats::{
    half_life, pearson_correlation, CointegrationTest, EngleGranger, LagSelection, OlsFit,
    StatisticsProvider,
};
use pairs_backtest_core::{with_metadata, AlignedPrices};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use super::{load_pair, PriceSourceArgs};

/// Arguments for the co-integration test
#[derive(Args, Debug, Default)]
pub struct CointArgs {
    #[command(flatten)]
    pub source: PriceSourceArgs,

    /// Fixed lag count for the residual ADF regression (default: AIC search)
    #[arg(long)]
    pub lags: Option<usize>,

    /// p-value below which the pair counts as co-integrated
    #[arg(long)]
    pub significance: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CointOutput {
    asset_a: String,
    asset_b: String,
    observations: usize,
    cointegration: CointegrationTest,
    is_cointegrated: bool,
    hedge_regression: OlsFit,
    hedge_ratio: f64,
    correlation: f64,
    half_life: Option<f64>,
}

pub fn run_coint(args: CointArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let pair = load_pair(&args.source)?;
    let mut config = pair.config;
    if let Some(lags) = args.lags {
        config.lag_selection = LagSelection::Fixed { lags };
    }
    if let Some(significance) = args.significance {
        config.significance = significance;
    }
    config.validate()?;

    let prices = AlignedPrices::align(&pair.asset_a, &pair.asset_b)?;
    let provider = EngleGranger::new(config.lag_selection);
    let cointegration = provider.cointegration(&prices.prices_a, &prices.prices_b)?;
    let hedge_regression = provider.ols(&prices.prices_a, &prices.prices_b)?;
    let spread = build_spread(&prices.prices_a, &prices.prices_b, hedge_regression.slope)?;

    let mut warnings = Vec::new();
    let is_cointegrated = cointegration.rejects_at(config.significance);
    if !is_cointegrated {
        warnings.push(format!(
            "{} and {} are not co-integrated at {} (p-value {:.4})",
            prices.symbol_a, prices.symbol_b, config.significance, cointegration.p_value
        ));
    }

    let output = CointOutput {
        asset_a: prices.symbol_a.clone(),
        asset_b: prices.symbol_b.clone(),
        observations: prices.len(),
        is_cointegrated,
        hedge_ratio: hedge_regression.slope,
        correlation: pearson_correlation(&prices.prices_a, &prices.prices_b),
        half_life: half_life(&spread),
        cointegration,
        hedge_regression,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Engle-Granger two-step co-integration test with MacKinnon p-value",
        &config,
        warnings,
        elapsed,
        output,
    ))?)
}
