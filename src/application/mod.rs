// Feature and label construction
pub mod features;

// Classifier implementation and predictor
pub mod ml;

// Walk-forward backtesting and future projection
pub mod backtesting;

// Precision and class-distribution reporting
pub mod evaluation;

// Run orchestrator
pub mod pipeline;
