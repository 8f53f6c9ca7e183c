mod phase;
mod schedule;
mod stages;
mod trainer;

pub use phase::TrainPhase;
pub use schedule::{UpdateGroup, online_schedule};
pub use trainer::{ProcessOptions, Processed, Trainer};
