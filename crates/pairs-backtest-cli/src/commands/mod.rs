pub mod backtest;
pub mod coint;
pub mod evaluate;

use clap::Args;
use pairs_backtest_core::pairs::BacktestInput;
use pairs_backtest_core::BacktestConfig;

use crate::input;

/// Where the two price series come from.
#[derive(Args, Debug, Default)]
pub struct PriceSourceArgs {
    /// Path to a JSON backtest input ({"asset_a": ..., "asset_b": ..., "config": ...})
    #[arg(long, conflicts_with = "prices")]
    pub input: Option<String>,

    /// Path to a wide price CSV with a date column and one column per symbol
    #[arg(long)]
    pub prices: Option<String>,

    /// Column of the dependent leg in --prices (default: first symbol column)
    #[arg(long, requires = "prices")]
    pub asset_a: Option<String>,

    /// Column of the hedge leg in --prices (default: next symbol column)
    #[arg(long, requires = "prices")]
    pub asset_b: Option<String>,
}

/// Load the pair from --prices, --input or piped JSON. Price CSVs carry no
/// config, so they start from the defaults.
pub fn load_pair(source: &PriceSourceArgs) -> Result<BacktestInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = source.prices {
        let pair = input::prices::read_price_csv(
            path,
            source.asset_a.as_deref(),
            source.asset_b.as_deref(),
        )?;
        Ok(BacktestInput {
            asset_a: pair.asset_a,
            asset_b: pair.asset_b,
            config: BacktestConfig::default(),
        })
    } else if let Some(ref path) = source.input {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("--prices <file.csv>, --input <file.json> or stdin required".into())
    }
}
