use chrono::NaiveDate;
use pairs_backtest_core::PriceSeries;
use std::fs::File;
use std::io::Read;
use tracing::{debug, warn};

use super::file::resolve_path;

/// Two price columns pulled out of a wide price table.
#[derive(Debug)]
pub struct PricePair {
    pub asset_a: PriceSeries,
    pub asset_b: PriceSeries,
}

/// Read a wide CSV (`date` column plus one close column per symbol).
///
/// `asset_a` / `asset_b` pick columns by header; without them the first two
/// non-date columns are used.
pub fn read_price_csv(
    path: &str,
    asset_a: Option<&str>,
    asset_b: Option<&str>,
) -> Result<PricePair, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_price_csv(file, asset_a, asset_b)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

pub fn parse_price_csv<R: Read>(
    reader: R,
    asset_a: Option<&str>,
    asset_b: Option<&str>,
) -> Result<PricePair, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let date_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or("price table has no 'date' column")?;
    let (col_a, col_b) = select_columns(&headers, date_col, asset_a, asset_b)?;
    if col_a == col_b {
        return Err(format!("asset columns must differ, both are '{}'", headers[col_a]).into());
    }

    let mut dates = Vec::new();
    let mut prices_a = Vec::new();
    let mut prices_b = Vec::new();
    let mut dropped = 0usize;

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let cell = |col: usize| record.get(col).unwrap_or("");

        let (raw_a, raw_b) = (cell(col_a), cell(col_b));
        if is_missing(raw_a) || is_missing(raw_b) {
            dropped += 1;
            debug!(line, "dropping row with a missing price");
            continue;
        }

        dates.push(parse_date(cell(date_col)).map_err(|e| format!("line {}: {}", line, e))?);
        prices_a.push(parse_price(raw_a, &headers[col_a], line)?);
        prices_b.push(parse_price(raw_b, &headers[col_b], line)?);
    }

    if dropped > 0 {
        warn!(
            dropped,
            asset_a = %headers[col_a],
            asset_b = %headers[col_b],
            "dropped rows with missing prices"
        );
    }

    Ok(PricePair {
        asset_a: PriceSeries::from_parts(headers[col_a].as_str(), &dates, &prices_a)?,
        asset_b: PriceSeries::from_parts(headers[col_b].as_str(), &dates, &prices_b)?,
    })
}

fn select_columns(
    headers: &[String],
    date_col: usize,
    asset_a: Option<&str>,
    asset_b: Option<&str>,
) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    let find = |symbol: &str| -> Result<usize, Box<dyn std::error::Error>> {
        headers
            .iter()
            .position(|h| h == symbol)
            .ok_or_else(|| format!("column '{}' not found (have: {})", symbol, headers.join(", ")).into())
    };
    let named_a = asset_a.map(&find).transpose()?;
    let named_b = asset_b.map(&find).transpose()?;
    // first symbol column not already taken
    let free = |taken: Option<usize>| {
        (0..headers.len())
            .find(|&i| i != date_col && Some(i) != taken)
            .ok_or("price table needs two symbol columns")
    };

    let a = match named_a {
        Some(col) => col,
        None => free(named_b)?,
    };
    let b = match named_b {
        Some(col) => col,
        None => free(Some(a))?,
    };
    Ok((a, b))
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null")
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", raw, e))
}

fn parse_price(raw: &str, symbol: &str, line: usize) -> Result<f64, Box<dyn std::error::Error>> {
    raw.parse::<f64>()
        .map_err(|e| format!("line {}: invalid {} price '{}': {}", line, symbol, raw, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "\
Date,KO,PEP,XOM
2020-01-02,54.69,135.82,70.90
2020-01-03,54.46,135.63,70.33
2020-01-06,,136.15,70.87
2020-01-07,54.06,134.01,70.29
";

    #[test]
    fn test_default_columns_and_dropped_rows() {
        let pair = parse_price_csv(TABLE.as_bytes(), None, None).unwrap();
        assert_eq!(pair.asset_a.symbol, "KO");
        assert_eq!(pair.asset_b.symbol, "PEP");
        assert_eq!(pair.asset_a.len(), 3);
        assert_eq!(pair.asset_b.prices(), vec![135.82, 135.63, 134.01]);
        assert_eq!(
            pair.asset_a.dates()[2],
            NaiveDate::from_ymd_opt(2020, 1, 7).unwrap()
        );
    }

    #[test]
    fn test_named_columns() {
        let pair = parse_price_csv(TABLE.as_bytes(), Some("XOM"), Some("PEP")).unwrap();
        assert_eq!(pair.asset_a.symbol, "XOM");
        assert_eq!(pair.asset_b.symbol, "PEP");
        // the empty KO cell does not matter for this pair
        assert_eq!(pair.asset_a.len(), 4);
    }

    #[test]
    fn test_only_asset_b_named() {
        let pair = parse_price_csv(TABLE.as_bytes(), None, Some("KO")).unwrap();
        assert_eq!(pair.asset_a.symbol, "PEP");
        assert_eq!(pair.asset_b.symbol, "KO");
    }

    #[test]
    fn test_unknown_column() {
        let err = parse_price_csv(TABLE.as_bytes(), Some("MSFT"), None).unwrap_err();
        assert!(err.to_string().contains("column 'MSFT' not found"));
    }

    #[test]
    fn test_same_column_twice() {
        assert!(parse_price_csv(TABLE.as_bytes(), Some("KO"), Some("KO")).is_err());
    }

    #[test]
    fn test_missing_date_column() {
        let err = parse_price_csv("KO,PEP\n1,2\n".as_bytes(), None, None).unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn test_timestamp_dates_and_nan_cells() {
        let table = "date,A,B\n2021-03-01 00:00:00,1.0,2.0\n2021-03-02 00:00:00,NaN,2.1\n";
        let pair = parse_price_csv(table.as_bytes(), None, None).unwrap();
        assert_eq!(pair.asset_a.len(), 1);
        assert_eq!(
            pair.asset_b.dates()[0],
            NaiveDate::from_ymd_opt(2021, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_bad_price_reports_line() {
        let table = "date,A,B\n2021-03-01,1.0,2.0\n2021-03-02,abc,2.1\n";
        let err = parse_price_csv(table.as_bytes(), None, None).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
