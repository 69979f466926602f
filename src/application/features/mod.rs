pub mod feature_builder;
pub mod label_builder;
