mod master;
mod regularizer;
mod score;

pub use master::{ClassWeight, MasterModelConfig};
pub use regularizer::{RegularizerConfig, RegularizerKind};
pub use score::{ScoreConfig, ScoreKind};
