use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::simulator::Position;

/// A round trip: consecutive bars holding the same non-flat position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    pub position: Position,
    /// Bar on which the position was opened
    pub entry_step: usize,
    /// Bar on which the position was closed or reversed, or the last bar if
    /// still open
    pub exit_step: usize,
    pub holding_periods: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    /// Sum of returns over the holding bars
    pub pnl: f64,
    /// True when the run ended with this position still held
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,
}

/// Aggregates over the trade list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trade_count: usize,
    pub winning_trades: usize,
    /// Winning fraction of trades, 0 without trades
    pub win_rate: f64,
    pub average_holding_periods: f64,
}

/// Split a simulated position sequence into round trips.
///
/// `positions` and `returns` are indexed from bar 1 as produced by
/// [`super::simulator::simulate`]; `z_scores` is indexed from bar 0.
pub fn extract_trades(positions: &[Position], returns: &[f64], z_scores: &[f64]) -> Vec<PairTrade> {
    let z_at = |bar: usize| z_scores.get(bar).copied().unwrap_or(f64::NAN);
    let mut trades = Vec::new();
    let mut current: Option<PairTrade> = None;

    for (k, (&position, &ret)) in positions.iter().zip(returns).enumerate() {
        let bar = k + 1;

        if let Some(trade) = current.as_mut() {
            if trade.position == position {
                trade.pnl += ret;
                trade.holding_periods += 1;
                continue;
            }
            trade.exit_step = bar;
            trade.exit_z = z_at(bar);
            trade.open = false;
        }
        if let Some(done) = current.take() {
            trades.push(done);
        }

        if !position.is_flat() {
            current = Some(PairTrade {
                position,
                entry_step: bar,
                exit_step: bar,
                holding_periods: 1,
                entry_z: z_at(bar),
                exit_z: f64::NAN,
                pnl: ret,
                open: true,
                entry_date: None,
                exit_date: None,
            });
        }
    }

    if let Some(mut trade) = current {
        trade.exit_step = positions.len();
        trade.exit_z = z_at(trade.exit_step);
        trades.push(trade);
    }
    trades
}

/// Fill in calendar dates from a bar-indexed date list.
pub fn assign_dates(trades: &mut [PairTrade], dates: &[NaiveDate]) {
    for trade in trades {
        trade.entry_date = dates.get(trade.entry_step).copied();
        trade.exit_date = dates.get(trade.exit_step).copied();
    }
}

pub fn trade_stats(trades: &[PairTrade]) -> TradeStats {
    let trade_count = trades.len();
    let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
    let (win_rate, average_holding_periods) = if trade_count == 0 {
        (0.0, 0.0)
    } else {
        let held: usize = trades.iter().map(|t| t.holding_periods).sum();
        (
            winning_trades as f64 / trade_count as f64,
            held as f64 / trade_count as f64,
        )
    };
    TradeStats {
        trade_count,
        winning_trades,
        win_rate,
        average_holding_periods,
    }
}
