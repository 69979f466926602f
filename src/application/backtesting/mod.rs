pub mod future_projector;
pub mod walk_forward;
