// Market data domain
pub mod market;

// Model inputs, outputs and the classifier seam
pub mod ml;

// Domain-specific error types
pub mod errors;
