pub mod evaluator;
pub mod reporting;
