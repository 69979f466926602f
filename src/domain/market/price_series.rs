use crate::domain::errors::SeriesError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Date-ordered daily bars.
///
/// Dates are strictly increasing, closes are finite and positive and the
/// other fields are finite.
/// The bars are never mutated once the series is built; derived columns live
/// in a [`FeatureFrame`](crate::domain::ml::dataset::FeatureFrame).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty);
        }

        for bar in &bars {
            Self::validate_bar(bar)?;
        }

        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::NonIncreasingDate {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }

        Ok(Self { bars })
    }

    /// Only the close drives labels and ratios, so it alone must be positive.
    /// Index histories often carry 0 in the other columns.
    fn validate_bar(bar: &PriceBar) -> Result<(), SeriesError> {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(SeriesError::InvalidPrice {
                date: bar.date,
                field: "close",
                value: bar.close,
            });
        }
        let others = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("volume", bar.volume),
        ];
        for (field, value) in others {
            if !value.is_finite() {
                return Err(SeriesError::InvalidPrice {
                    date: bar.date,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Keeps only bars dated on or after `since`.
    pub fn since(&self, since: NaiveDate) -> Result<Self, SeriesError> {
        let bars: Vec<PriceBar> = self
            .bars
            .iter()
            .filter(|b| b.date >= since)
            .copied()
            .collect();
        Self::new(bars)
    }

    /// Returns a new series with `bars` appended after the existing ones.
    pub fn extended(&self, bars: &[PriceBar]) -> Result<Self, SeriesError> {
        let mut all = self.bars.clone();
        all.extend_from_slice(bars);
        Self::new(all)
    }
}
