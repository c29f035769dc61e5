use clap::Args;
use pairs_backtest_core::pairs::run_backtest_default;
use pairs_backtest_core::stats::LagSelection;
use pairs_backtest_core::BacktestConfig;
use serde_json::Value;
use tracing::info;

use super::{load_pair, PriceSourceArgs};
use crate::input;
use crate::output::equity;

/// Arguments for a full pairs backtest
#[derive(Args, Debug, Default)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub source: PriceSourceArgs,

    /// YAML or JSON config file; replaces any config in --input
    #[arg(long)]
    pub config: Option<String>,

    /// |z| above which a position is opened
    #[arg(long)]
    pub entry: Option<f64>,

    /// |z| below which the position is closed
    #[arg(long)]
    pub exit: Option<f64>,

    /// Annualisation factor for the Sharpe ratio
    #[arg(long)]
    pub periods_per_year: Option<f64>,

    /// Fixed lag count for the residual ADF regression (default: AIC search)
    #[arg(long)]
    pub lags: Option<usize>,

    /// Write the dated equity curve to this CSV file
    #[arg(long)]
    pub equity_curve: Option<String>,

    /// Keep the per-bar position, return and PnL series in the output
    #[arg(long)]
    pub series: bool,
}

pub fn run_backtest(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut bt_input = load_pair(&args.source)?;
    if let Some(ref path) = args.config {
        bt_input.config = input::file::read_config(path)?;
    }
    bt_input.config = apply_overrides(bt_input.config, &args);

    let output = run_backtest_default(&bt_input)?;

    if let Some(ref path) = args.equity_curve {
        equity::write_equity_file(path, &output.result.equity_curve)?;
        info!(path = %path, bars = output.result.equity_curve.len(), "wrote equity curve");
    }

    let mut value = serde_json::to_value(&output)?;
    if !args.series {
        strip_series(&mut value);
    }
    Ok(value)
}

fn apply_overrides(mut config: BacktestConfig, args: &BacktestArgs) -> BacktestConfig {
    if let Some(entry) = args.entry {
        config.entry_threshold = entry;
    }
    if let Some(exit) = args.exit {
        config.exit_threshold = exit;
    }
    if let Some(periods) = args.periods_per_year {
        config.periods_per_year = periods;
    }
    if let Some(lags) = args.lags {
        config.lag_selection = LagSelection::Fixed { lags };
    }
    config
}

/// Per-bar series that only appear with --series.
const SERIES_FIELDS: [&str; 3] = ["positions", "returns", "equity_curve"];
const PERFORMANCE_SERIES_FIELDS: [&str; 2] = ["cumulative_pnl", "drawdown"];

fn strip_series(value: &mut Value) {
    let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) else {
        return;
    };
    for field in SERIES_FIELDS {
        result.remove(field);
    }
    if let Some(perf) = result.get_mut("performance").and_then(Value::as_object_mut) {
        for field in PERFORMANCE_SERIES_FIELDS {
            perf.remove(field);
        }
    }
}
