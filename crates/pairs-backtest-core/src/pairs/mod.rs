pub mod backtest;
pub mod performance;
pub mod simulator;
pub mod spread;
pub mod trades;

pub use backtest::{run_backtest, run_backtest_default, BacktestInput, BacktestReport};
pub use performance::{evaluate, PerformanceSummary};
pub use simulator::{simulate, Position, Simulation, SimulatorState, Thresholds};
pub use spread::{build_spread, z_score, ZScore};
