use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Out-of-sample prediction for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: NaiveDate,
    /// Known next-day direction; `None` for projected future dates
    pub actual: Option<u8>,
    pub predicted: u8,
}

impl PredictionRecord {
    pub fn is_scored(&self) -> bool {
        self.actual.is_some()
    }
}

/// Probability cutoff mapping P(up) to a long signal.
///
/// A probability equal to the threshold counts as positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThreshold(f64);

impl DecisionThreshold {
    pub const DEFAULT: f64 = 0.6;

    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn classify(&self, probability: f64) -> u8 {
        u8::from(probability >= self.0)
    }
}

impl Default for DecisionThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let threshold = DecisionThreshold::default();
        assert_eq!(threshold.classify(0.6), 1);
        assert_eq!(threshold.classify(0.5999), 0);
        assert_eq!(threshold.classify(1.0), 1);
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(DecisionThreshold::new(0.5).is_some());
        assert!(DecisionThreshold::new(1.2).is_none());
        assert!(DecisionThreshold::new(f64::NAN).is_none());
    }
}
