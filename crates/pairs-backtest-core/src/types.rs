use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::PairsResult;

/// Instrument prices. Kept as IEEE-754 so undefined metrics can carry NaN.
pub type Price = f64;

/// A single observation for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Price,
}

/// Ordered price history for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Build a series from parallel date and price slices.
    pub fn from_parts(
        symbol: impl Into<String>,
        dates: &[NaiveDate],
        prices: &[Price],
    ) -> PairsResult<Self> {
        let symbol = symbol.into();
        if dates.len() != prices.len() {
            return Err(PairsError::InputMismatch(format!(
                "{symbol}: {} dates but {} prices",
                dates.len(),
                prices.len()
            )));
        }
        let points = dates
            .iter()
            .zip(prices)
            .map(|(&date, &price)| PricePoint { date, price })
            .collect();
        Ok(Self { symbol, points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> Vec<Price> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }
}

/// Two price series validated to share the same date index.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPrices {
    pub symbol_a: String,
    pub symbol_b: String,
    pub dates: Vec<NaiveDate>,
    pub prices_a: Vec<Price>,
    pub prices_b: Vec<Price>,
}

impl AlignedPrices {
    /// Validate that `a` and `b` are non-empty, equally long, strictly
    /// increasing in date, matched date for date, and finite.
    pub fn align(a: &PriceSeries, b: &PriceSeries) -> PairsResult<Self> {
        if a.is_empty() || b.is_empty() {
            return Err(PairsError::InsufficientData(format!(
                "{} has {} prices and {} has {} prices; both must be non-empty",
                a.symbol,
                a.len(),
                b.symbol,
                b.len()
            )));
        }
        if a.len() != b.len() {
            return Err(PairsError::InputMismatch(format!(
                "{} has {} prices but {} has {}",
                a.symbol,
                a.len(),
                b.symbol,
                b.len()
            )));
        }

        check_increasing(a)?;
        check_increasing(b)?;

        for (i, (pa, pb)) in a.points.iter().zip(&b.points).enumerate() {
            if pa.date != pb.date {
                return Err(PairsError::InputMismatch(format!(
                    "dates diverge at index {i}: {} has {} but {} has {}",
                    a.symbol, pa.date, b.symbol, pb.date
                )));
            }
            for (symbol, price) in [(&a.symbol, pa.price), (&b.symbol, pb.price)] {
                if !price.is_finite() {
                    return Err(PairsError::InvalidInput {
                        field: format!("{symbol}[{i}]"),
                        reason: format!("price on {} is not finite", pa.date),
                    });
                }
            }
        }

        Ok(Self {
            symbol_a: a.symbol.clone(),
            symbol_b: b.symbol.clone(),
            dates: a.dates(),
            prices_a: a.prices(),
            prices_b: b.prices(),
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn check_increasing(series: &PriceSeries) -> PairsResult<()> {
    for (i, w) in series.points.windows(2).enumerate() {
        if w[1].date <= w[0].date {
            return Err(PairsError::InputMismatch(format!(
                "{} dates must be strictly increasing: {} at index {} follows {}",
                series.symbol,
                w[1].date,
                i + 1,
                w[0].date
            )));
        }
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
