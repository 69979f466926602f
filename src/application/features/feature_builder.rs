use crate::application::features::label_builder::build_labels;
use crate::domain::market::price_series::{PriceBar, PriceSeries};
use crate::domain::ml::dataset::{FeatureFrame, FeatureRow};
use crate::domain::ml::feature_registry::{FeatureKey, FeatureKind, FeatureSet, RawField};
use statrs::statistics::{Data, Distribution};
use tracing::debug;

/// Derives model inputs from a price series.
///
/// Columns follow [`FeatureSet::keys`]. A row is emitted only when every
/// column is defined for its date, so the first `max_horizon` rows of an
/// engineered frame are always dropped.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    feature_set: FeatureSet,
}

impl FeatureBuilder {
    pub fn new(feature_set: FeatureSet) -> Self {
        Self { feature_set }
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    /// Builds features with labels derived from the series itself.
    pub fn build(&self, series: &PriceSeries) -> FeatureFrame {
        let labels = build_labels(series);
        self.build_with_labels(series, &labels)
    }

    /// Builds features from `labels`, one per bar.
    ///
    /// Rows keep their (possibly undefined) label; callers that train or score
    /// take [`FeatureFrame::labelled`].
    pub fn build_with_labels(&self, series: &PriceSeries, labels: &[Option<u8>]) -> FeatureFrame {
        let columns = self.compute_columns(series.bars(), labels);
        let keys = self.feature_set.keys();

        let rows: Vec<FeatureRow> = series
            .bars()
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                let features = columns
                    .iter()
                    .map(|col| col[i])
                    .collect::<Option<Vec<f64>>>()?;
                Some(FeatureRow {
                    date: bar.date,
                    features,
                    label: labels.get(i).copied().flatten(),
                })
            })
            .collect();

        debug!(
            "Built {} feature rows ({} columns) from {} bars",
            rows.len(),
            keys.len(),
            series.len()
        );

        FeatureFrame::new(self.feature_set.names(), rows)
    }

    /// Column-major feature values; `None` where history is insufficient.
    pub fn compute_columns(
        &self,
        bars: &[PriceBar],
        labels: &[Option<u8>],
    ) -> Vec<Vec<Option<f64>>> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        self.feature_set
            .keys()
            .iter()
            .map(|key| compute_column(key, bars, &closes, labels))
            .collect()
    }
}

fn compute_column(
    key: &FeatureKey,
    bars: &[PriceBar],
    closes: &[f64],
    labels: &[Option<u8>],
) -> Vec<Option<f64>> {
    match key.kind {
        FeatureKind::CloseRatio => close_ratio(closes, key.horizon),
        FeatureKind::Trend => label_trend(labels, key.horizon),
        FeatureKind::Raw(field) => bars.iter().map(|b| Some(raw_value(b, field))).collect(),
    }
}

fn raw_value(bar: &PriceBar, field: RawField) -> f64 {
    match field {
        RawField::Close => bar.close,
        RawField::Volume => bar.volume,
        RawField::Open => bar.open,
        RawField::High => bar.high,
        RawField::Low => bar.low,
    }
}

/// close / mean(close over the trailing `horizon` bars, current bar included)
pub fn close_ratio(closes: &[f64], horizon: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if horizon == 0 || i + 1 < horizon {
                return None;
            }
            let window = &closes[i + 1 - horizon..=i];
            let mean = Data::new(window.to_vec()).mean()?;
            if mean == 0.0 {
                return None;
            }
            Some(closes[i] / mean)
        })
        .collect()
}

/// Sum of labels over the `horizon` dates ending the day before.
///
/// The label of date `i` is never part of its own trend value.
pub fn label_trend(labels: &[Option<u8>], horizon: usize) -> Vec<Option<f64>> {
    (0..labels.len())
        .map(|i| {
            if horizon == 0 || i < horizon {
                return None;
            }
            labels[i - horizon..i]
                .iter()
                .try_fold(0.0, |acc, l| l.map(|v| acc + f64::from(v)))
        })
        .collect()
}
