mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::backtest::BacktestArgs;
use commands::coint::CointArgs;
use commands::evaluate::EvaluateArgs;

/// Co-integration pairs-trading backtests
#[derive(Parser)]
#[command(
    name = "pairs",
    version,
    about = "Co-integration pairs-trading backtests",
    long_about = "Tests two price series for co-integration, estimates the hedge ratio, \
                  trades the z-scored spread with entry/exit thresholds and reports \
                  Sharpe ratio, drawdown and round-trip trades."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log verbosity on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full co-integration backtest on a pair
    Backtest(BacktestArgs),
    /// Engle-Granger co-integration test and hedge ratio only
    Coint(CointArgs),
    /// Sharpe ratio and drawdown of a return series
    Evaluate(EvaluateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "pairs_backtest_core=info,pairs_backtest_cli=info,warn",
        _ => "pairs_backtest_core=debug,pairs_backtest_cli=debug,info",
    }
}

fn init_tracing(verbose: u8) {
    // stdout carries the result, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Backtest(args) => commands::backtest::run_backtest(args),
        Commands::Coint(args) => commands::coint::run_coint(args),
        Commands::Evaluate(args) => commands::evaluate::run_evaluate(args),
        Commands::Version => {
            println!("pairs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
