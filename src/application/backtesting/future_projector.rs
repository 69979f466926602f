use crate::application::features::feature_builder::FeatureBuilder;
use crate::application::features::label_builder::build_labels;
use crate::application::ml::predictor::Predictor;
use crate::domain::errors::{BacktestError, ModelError};
use crate::domain::market::calendar::next_business_days;
use crate::domain::market::price_series::{PriceBar, PriceSeries};
use crate::domain::ml::dataset::FeatureRow;
use crate::domain::ml::prediction::PredictionRecord;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Extends predictions past the last known bar.
///
/// Future bars carry the last known OHLCV values forward. Labels that are not
/// known yet (the last historical date, then each future date) are filled with
/// the model's own prediction for that date as it is produced, which keeps the
/// trend columns defined. Every step refits on the full labelled history.
#[derive(Debug, Clone, Copy)]
pub struct FutureProjector {
    days: usize,
}

impl FutureProjector {
    pub fn new(days: usize) -> Self {
        Self { days }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    /// One unscored record per future business day, in date order.
    pub fn project(
        &self,
        series: &PriceSeries,
        builder: &FeatureBuilder,
        predictor: &mut Predictor,
    ) -> Result<Vec<PredictionRecord>, BacktestError> {
        if self.days == 0 {
            return Ok(Vec::new());
        }

        let training = builder.build(series).labelled();
        if training.is_empty() {
            return Err(BacktestError::NoTrainingData);
        }
        let Some(last_bar) = series.last().copied() else {
            return Err(BacktestError::NoTrainingData);
        };

        let mut labels = build_labels(series);
        let frame = builder.build_with_labels(series, &labels);
        let today = predict_last(predictor, training.rows(), frame.rows(), last_bar.date)?;
        if let Some(label) = labels.last_mut() {
            *label = Some(today);
        }

        let dates = next_business_days(last_bar.date, self.days);
        info!(
            "Projecting {} business days after {} using {} training rows",
            dates.len(),
            last_bar.date,
            training.len()
        );

        let mut future_bars: Vec<PriceBar> = Vec::with_capacity(dates.len());
        let mut records = Vec::with_capacity(dates.len());
        for date in dates {
            future_bars.push(PriceBar { date, ..last_bar });
            labels.push(None);

            let extended = series.extended(&future_bars)?;
            let frame = builder.build_with_labels(&extended, &labels);
            let predicted = predict_last(predictor, training.rows(), frame.rows(), date)?;

            if let Some(label) = labels.last_mut() {
                *label = Some(predicted);
            }
            debug!("Projected {} -> {}", date, predicted);
            records.push(PredictionRecord {
                date,
                actual: None,
                predicted,
            });
        }

        Ok(records)
    }
}

/// Predicts the final row of `rows`, which must be dated `date`.
fn predict_last(
    predictor: &mut Predictor,
    train: &[FeatureRow],
    rows: &[FeatureRow],
    date: NaiveDate,
) -> Result<u8, BacktestError> {
    let tail = match rows.last() {
        Some(row) if row.date == date => &rows[rows.len() - 1..],
        _ => return Err(BacktestError::UndefinedFeatures { date }),
    };

    let record = predictor
        .predict(train, tail)
        .map_err(|source| BacktestError::ProjectionFailed { date, source })?
        .pop();
    record
        .map(|r| r.predicted)
        .ok_or_else(|| BacktestError::ProjectionFailed {
            date,
            source: ModelError::Backend {
                reason: "predictor returned no record".to_string(),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::predictor::tests::EchoClassifier;
    use crate::domain::ml::feature_registry::FeatureSet;
    use crate::domain::ml::prediction::DecisionThreshold;
    use chrono::{Datelike, Days, Weekday};

    fn zigzag_series(len: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..len)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 101.0 };
                PriceBar {
                    date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_projects_business_days_without_actuals() {
        let series = zigzag_series(30);
        let builder = FeatureBuilder::new(FeatureSet::Engineered {
            horizons: vec![2, 3],
        });
        let mut predictor =
            Predictor::new(EchoClassifier::boxed(), DecisionThreshold::new(0.5).unwrap());

        let records = FutureProjector::new(4)
            .project(&series, &builder, &mut predictor)
            .unwrap();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.actual.is_none()));
        assert!(
            records
                .iter()
                .all(|r| !matches!(r.date.weekday(), Weekday::Sat | Weekday::Sun))
        );
        let last_known = series.last().unwrap().date;
        assert!(records[0].date > last_known);
        assert!(records.windows(2).all(|p| p[0].date < p[1].date));
    }

    #[test]
    fn test_zero_days_is_noop() {
        let series = zigzag_series(30);
        let builder = FeatureBuilder::default();
        let mut predictor = Predictor::new(EchoClassifier::boxed(), DecisionThreshold::default());
        let records = FutureProjector::new(0)
            .project(&series, &builder, &mut predictor)
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_insufficient_history_has_no_training_data() {
        let series = zigzag_series(10);
        let builder = FeatureBuilder::new(FeatureSet::Engineered {
            horizons: vec![20],
        });
        let mut predictor = Predictor::new(EchoClassifier::boxed(), DecisionThreshold::default());
        assert_eq!(
            FutureProjector::new(2).project(&series, &builder, &mut predictor),
            Err(BacktestError::NoTrainingData)
        );
    }
}
