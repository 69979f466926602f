use crate::domain::errors::ModelError;

/// Interface for binary classifiers used by the predictor
pub trait ProbabilisticClassifier: Send + Sync {
    /// Fit from scratch; any previously learned state is discarded.
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> Result<(), ModelError>;

    /// Probability (0.0 to 1.0) that each row belongs to class 1
    fn predict_probability(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Unfitted instance with the same hyperparameters
    fn fresh(&self) -> Box<dyn ProbabilisticClassifier>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Rejects empty or single-class training labels.
pub fn check_training_labels(labels: &[u8]) -> Result<(), ModelError> {
    if labels.is_empty() {
        return Err(ModelError::DegenerateLabels {
            reason: "training set is empty".to_string(),
        });
    }
    if let Some(bad) = labels.iter().find(|&&l| l > 1) {
        return Err(ModelError::DegenerateLabels {
            reason: format!("label {} is not binary", bad),
        });
    }
    let positives = labels.iter().filter(|&&l| l == 1).count();
    if positives == 0 || positives == labels.len() {
        return Err(ModelError::DegenerateLabels {
            reason: format!("only class {} present", labels[0]),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_class_is_degenerate() {
        assert!(check_training_labels(&[1, 1, 1]).is_err());
        assert!(check_training_labels(&[]).is_err());
        assert!(check_training_labels(&[0, 2]).is_err());
        assert!(check_training_labels(&[0, 1, 1]).is_ok());
    }
}
