mod pool;
mod processor;
mod theta;

pub use pool::WorkerPool;
pub use processor::{BatchOutcome, NwtDelta, ProcessTask};
pub use theta::{ThetaBlock, assemble_theta};
