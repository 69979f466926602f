use crate::domain::ml::prediction::PredictionRecord;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let mut matrix = Self::default();
        for record in records {
            match (record.predicted, record.actual) {
                (1, Some(1)) => matrix.true_positives += 1,
                (1, Some(_)) => matrix.false_positives += 1,
                (_, Some(1)) => matrix.false_negatives += 1,
                (_, Some(_)) => matrix.true_negatives += 1,
                (_, None) => {}
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// TP / (TP + FP); `None` when nothing was predicted positive
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

/// Counts of each class, like a value_counts over a 0/1 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub down: usize,
    pub up: usize,
}

impl ClassDistribution {
    pub fn total(&self) -> usize {
        self.down + self.up
    }

    pub fn up_ratio(&self) -> f64 {
        ratio(self.up, self.total()).unwrap_or(0.0)
    }

    pub fn down_ratio(&self) -> f64 {
        ratio(self.down, self.total()).unwrap_or(0.0)
    }

    fn add(&mut self, class: u8) {
        if class == 1 {
            self.up += 1;
        } else {
            self.down += 1;
        }
    }
}

/// Summary statistics over the scored predictions of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scored: usize,
    pub confusion: ConfusionMatrix,
    /// 0.0 when no positive predictions were made
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub predicted: ClassDistribution,
    pub actual: ClassDistribution,
    /// Precision of always predicting "up": the actual up ratio
    pub baseline_precision: f64,
    pub edge_over_baseline: f64,
}

/// Scores records with a known outcome; projected future records are ignored.
pub fn evaluate(records: &[PredictionRecord]) -> Evaluation {
    let scored: Vec<PredictionRecord> = records
        .iter()
        .filter(|r| r.is_scored())
        .copied()
        .collect();
    let confusion = ConfusionMatrix::from_records(&scored);

    let mut predicted = ClassDistribution::default();
    let mut actual = ClassDistribution::default();
    for record in &scored {
        predicted.add(record.predicted);
        if let Some(label) = record.actual {
            actual.add(label);
        }
    }

    let precision = match confusion.precision() {
        Some(p) => p,
        None => {
            if !scored.is_empty() {
                warn!(
                    "No positive predictions in {} scored rows; precision set to 0",
                    scored.len()
                );
            }
            0.0
        }
    };
    let baseline_precision = actual.up_ratio();

    Evaluation {
        scored: scored.len(),
        confusion,
        precision,
        recall: confusion.recall().unwrap_or(0.0),
        accuracy: confusion.accuracy().unwrap_or(0.0),
        predicted,
        actual,
        baseline_precision,
        edge_over_baseline: precision - baseline_precision,
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}
