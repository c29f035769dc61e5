use clap::Args;
use pairs_backtest_core::pairs::evaluate;
use pairs_backtest_core::pairs::performance::TRADING_DAYS_PER_YEAR;
use pairs_backtest_core::with_metadata;
use serde_json::{json, Value};
use std::time::Instant;

use crate::input;

/// Arguments for evaluating a return series
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Path to a JSON array of returns, or an object with a 'returns' array
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated per-bar returns (e.g. "0.5,-0.25,0,1.0")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<f64>>,

    /// Annualisation factor for the Sharpe ratio
    #[arg(long, default_value_t = TRADING_DAYS_PER_YEAR)]
    pub periods_per_year: f64,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let returns = get_returns(&args.input, &args.returns)?;
    let summary = evaluate(&returns, args.periods_per_year)?;

    let warnings = summary
        .undefined_metrics
        .iter()
        .map(|m| format!("{} is undefined: {}", m.metric, m.reason))
        .collect();
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Annualised Sharpe ratio (sample std) and maximum drawdown of cumulative PnL",
        &json!({ "periods_per_year": args.periods_per_year }),
        warnings,
        elapsed,
        summary,
    ))?)
}

fn get_returns(
    input_path: &Option<String>,
    cli_returns: &Option<Vec<f64>>,
) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    if let Some(ref path) = input_path {
        parse_returns(&input::file::read_json_value(path)?)
    } else if let Some(ref rets) = cli_returns {
        Ok(rets.clone())
    } else if let Some(data) = input::stdin::read_stdin()? {
        parse_returns(&data)
    } else {
        Err("Provide --returns or --input file or pipe JSON via stdin".into())
    }
}

/// Accepts `[r, ...]` or `{"returns": [r, ...]}`. `null` entries become NaN
/// so undefined bars stay undefined.
fn parse_returns(data: &Value) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    let arr = match data {
        Value::Array(arr) => arr,
        Value::Object(obj) => obj
            .get("returns")
            .and_then(Value::as_array)
            .ok_or("JSON object must contain a 'returns' array")?,
        _ => return Err("Expected a JSON array of returns or object with 'returns' key".into()),
    };
    arr.iter()
        .enumerate()
        .map(|(i, v)| -> Result<f64, Box<dyn std::error::Error>> {
            match v {
                Value::Null => Ok(f64::NAN),
                _ => Ok(v
                    .as_f64()
                    .ok_or_else(|| format!("returns[{}] is not a number: {}", i, v))?),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_array() {
        let returns = parse_returns(&json!([0.5, -1, 0])).unwrap();
        assert_eq!(returns, vec![0.5, -1.0, 0.0]);
    }

    #[test]
    fn test_parse_object_with_nulls() {
        let returns = parse_returns(&json!({"returns": [1.0, null]})).unwrap();
        assert_eq!(returns[0], 1.0);
        assert!(returns[1].is_nan());
    }

    #[test]
    fn test_parse_rejects_strings() {
        let err = parse_returns(&json!([1.0, "x"])).unwrap_err();
        assert!(err.to_string().contains("returns[1]"));
        assert!(parse_returns(&json!({"r": []})).is_err());
    }

    #[test]
    fn test_cli_returns_are_evaluated() {
        let args = EvaluateArgs {
            input: None,
            returns: Some(vec![0.0, 0.0, -1.0, 1.0, 0.0, -1.0]),
            periods_per_year: 252.0,
        };
        let value = run_evaluate(args).unwrap();
        assert_eq!(value["result"]["max_drawdown"], json!(1.0));
        assert_eq!(value["result"]["total_pnl"], json!(-1.0));
        assert_eq!(value["metadata"]["precision"], json!("ieee754_f64"));
    }
}
