use crate::domain::errors::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One dated row of model inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub features: Vec<f64>,
    /// `None` when the next close is not known yet
    pub label: Option<u8>,
}

/// Date-ordered feature rows sharing one column layout.
///
/// Every row has a value for every column; rows whose features could not be
/// computed are dropped by the builder rather than stored with placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>, rows: Vec<FeatureRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_row(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Rows with a known label, i.e. usable for training and scoring.
    pub fn labelled(&self) -> FeatureFrame {
        FeatureFrame {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r.label.is_some())
                .cloned()
                .collect(),
        }
    }
}

pub fn feature_matrix(rows: &[FeatureRow]) -> Vec<Vec<f64>> {
    rows.iter().map(|r| r.features.clone()).collect()
}

/// Labels of a training window. Every row must be labelled.
pub fn training_labels(rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError> {
    rows.iter()
        .map(|r| {
            r.label.ok_or_else(|| ModelError::DegenerateLabels {
                reason: format!("row {} has no label", r.date),
            })
        })
        .collect()
}
