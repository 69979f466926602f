pub mod predictor;
pub mod random_forest;
