use pairs_backtest_core::pairs::backtest::EquityPoint;
use serde::Serialize;
use std::fs::File;
use std::io;

/// One row of the equity-curve file.
#[derive(Serialize)]
struct EquityRow {
    date: String,
    position: i8,
    #[serde(rename = "return")]
    ret: Option<f64>,
    cumulative_pnl: Option<f64>,
    drawdown: Option<f64>,
}

impl From<&EquityPoint> for EquityRow {
    fn from(p: &EquityPoint) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            date: p.date.format("%Y-%m-%d").to_string(),
            position: p.position.as_i8(),
            ret: finite(p.ret),
            cumulative_pnl: finite(p.cumulative_pnl),
            drawdown: finite(p.drawdown),
        }
    }
}

/// Write `date,position,return,cumulative_pnl,drawdown` per bar. Undefined
/// values are left empty.
pub fn write_equity_curve<W: io::Write>(writer: W, curve: &[EquityPoint]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if curve.is_empty() {
        wtr.write_record(["date", "position", "return", "cumulative_pnl", "drawdown"])?;
    }
    for point in curve {
        wtr.serialize(EquityRow::from(point))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_equity_file(path: &str, curve: &[EquityPoint]) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path).map_err(|e| format!("Failed to create '{}': {}", path, e))?;
    write_equity_curve(file, curve).map_err(|e| format!("Failed to write '{}': {}", path, e))?;
    Ok(())
}
