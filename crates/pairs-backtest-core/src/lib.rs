pub mod config;
pub mod error;
pub mod pairs;
pub mod stats;
pub mod types;

pub use config::BacktestConfig;
pub use error::PairsError;
pub use types::*;

/// Standard result type for all pairs-backtest operations
pub type PairsResult<T> = Result<T, PairsError>;
