//! OHLCV history from CSV files.
//!
//! Expects a header with at least `Date,Open,High,Low,Close,Volume` (the
//! layout of a Yahoo Finance download). Other columns such as `Dividends` or
//! `Stock Splits` are ignored. Timestamps like `2019-01-02 00:00:00+01:00`
//! are truncated to their date.

use crate::domain::market::price_series::{PriceBar, PriceSeries};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct OhlcvRecord {
    #[serde(rename = "Date", alias = "date", alias = "Datetime")]
    date: String,
    #[serde(rename = "Open", alias = "open")]
    open: f64,
    #[serde(rename = "High", alias = "high")]
    high: f64,
    #[serde(rename = "Low", alias = "low")]
    low: f64,
    #[serde(rename = "Close", alias = "close")]
    close: f64,
    #[serde(rename = "Volume", alias = "volume")]
    volume: f64,
}

pub fn load_price_series(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open price data {}", path.display()))?;
    let series = read_price_series(BufReader::new(file))
        .with_context(|| format!("Failed to load price data {}", path.display()))?;
    info!(
        "Loaded {} bars from {} ({:?} .. {:?})",
        series.len(),
        path.display(),
        series.first_date(),
        series.last().map(|b| b.date)
    );
    Ok(series)
}

pub fn read_price_series<R: Read>(reader: R) -> Result<PriceSeries> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();

    for (line, result) in rdr.deserialize::<OhlcvRecord>().enumerate() {
        // header is line 1
        let record = result.with_context(|| format!("Invalid CSV record on line {}", line + 2))?;
        let date = parse_date(&record.date)
            .with_context(|| format!("Invalid date '{}' on line {}", record.date, line + 2))?;
        bars.push(PriceBar {
            date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    Ok(PriceSeries::new(bars)?)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    Ok(NaiveDate::parse_from_str(day, "%Y-%m-%d")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAHOO: &str = "\
Date,Open,High,Low,Close,Volume,Dividends,Stock Splits
2019-01-02 00:00:00+01:00,800.5,805.0,798.1,803.2,120000,0.0,0.0
2019-01-03 00:00:00+01:00,803.0,810.0,801.0,808.7,98000,0.0,0.0
2019-01-04 00:00:00+01:00,808.0,809.0,795.5,797.0,143000,0.0,0.0
";

    #[test]
    fn test_reads_yahoo_layout() {
        let series = read_price_series(YAHOO.as_bytes()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.first_date(),
            NaiveDate::from_ymd_opt(2019, 1, 2)
        );
        assert_eq!(series.closes(), vec![803.2, 808.7, 797.0]);
        assert_eq!(series.bars()[2].volume, 143000.0);
    }

    #[test]
    fn test_lowercase_headers() {
        let data = "date,open,high,low,close,volume\n2020-05-01,1,2,0.5,1.5,10\n";
        let series = read_price_series(data.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_zero_open_high_low_are_kept() {
        let data = "\
Date,Open,High,Low,Close,Volume
1996-01-02,0,0,0,100.5,0
1996-01-03,0,0,0,101.2,0
";
        let series = read_price_series(data.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![100.5, 101.2]);
        assert_eq!(series.bars()[0].open, 0.0);
    }

    #[test]
    fn test_unsorted_dates_are_rejected() {
        let data = "\
Date,Open,High,Low,Close,Volume
2020-05-02,1,2,0.5,1.5,10
2020-05-01,1,2,0.5,1.5,10
";
        assert!(read_price_series(data.as_bytes()).is_err());
    }

    #[test]
    fn test_bad_number_reports_line() {
        let data = "Date,Open,High,Low,Close,Volume\n2020-05-01,1,2,0.5,oops,10\n";
        let err = read_price_series(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
