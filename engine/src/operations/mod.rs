mod tracker;

pub use tracker::{OperationId, OperationState, OperationTracker};
