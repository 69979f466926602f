use crate::domain::errors::ModelError;
use crate::domain::ml::classifier::ProbabilisticClassifier;
use crate::domain::ml::dataset::{FeatureRow, feature_matrix, training_labels};
use crate::domain::ml::prediction::{DecisionThreshold, PredictionRecord};

/// Fits the owned classifier on a training window and labels a test window.
pub struct Predictor {
    model: Box<dyn ProbabilisticClassifier>,
    threshold: DecisionThreshold,
}

impl Predictor {
    pub fn new(model: Box<dyn ProbabilisticClassifier>, threshold: DecisionThreshold) -> Self {
        Self { model, threshold }
    }

    pub fn threshold(&self) -> DecisionThreshold {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Same hyperparameters and threshold, no fitted state.
    pub fn fresh(&self) -> Predictor {
        Predictor {
            model: self.model.fresh(),
            threshold: self.threshold,
        }
    }

    /// Refits on `train` and returns one record per `test` row, in order.
    ///
    /// An empty test window yields an empty batch without fitting.
    pub fn predict(
        &mut self,
        train: &[FeatureRow],
        test: &[FeatureRow],
    ) -> Result<Vec<PredictionRecord>, ModelError> {
        if test.is_empty() {
            return Ok(Vec::new());
        }

        let labels = training_labels(train)?;
        self.model.fit(&feature_matrix(train), &labels)?;

        let probabilities = self.model.predict_probability(&feature_matrix(test))?;
        if probabilities.len() != test.len() {
            return Err(ModelError::Backend {
                reason: format!(
                    "expected {} probabilities, got {}",
                    test.len(),
                    probabilities.len()
                ),
            });
        }

        Ok(test
            .iter()
            .zip(probabilities)
            .map(|(row, p)| PredictionRecord {
                date: row.date,
                actual: row.label,
                predicted: self.threshold.classify(p),
            })
            .collect())
    }
}
