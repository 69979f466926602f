use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building a price series from raw bars
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("Price series is empty")]
    Empty,

    #[error("Dates must be strictly increasing: {previous} is followed by {current}")]
    NonIncreasingDate {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Invalid {field} on {date}: {value}")]
    InvalidPrice {
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },
}

/// Errors related to fitting or querying a classifier
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Training labels are degenerate: {reason}")]
    DegenerateLabels { reason: String },

    #[error("Feature dimension mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Training set has {features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Model backend failed: {reason}")]
    Backend { reason: String },
}

/// Errors raised by the walk-forward backtester and future projector
#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error("Step size must be positive")]
    InvalidStep,

    #[error("Window {index} (train rows 0..{train_end}) failed: {source}")]
    WindowFailed {
        index: usize,
        train_end: usize,
        #[source]
        source: ModelError,
    },

    #[error("Projection failed for {date}: {source}")]
    ProjectionFailed {
        date: NaiveDate,
        #[source]
        source: ModelError,
    },

    #[error("Features are undefined for {date}")]
    UndefinedFeatures { date: NaiveDate },

    #[error("No labelled rows with defined features are available for training")]
    NoTrainingData,

    #[error(transparent)]
    Series(#[from] SeriesError),
}
