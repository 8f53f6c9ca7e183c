mod items_processed;
mod perplexity;
mod registry;
mod score;
mod sparsity_phi;
mod sparsity_theta;
mod top_tokens;

pub use items_processed::ItemsProcessed;
pub use perplexity::Perplexity;
pub use registry::ScoreSet;
pub use score::{ItemContext, Score, ScoreInputs, merge};
pub use sparsity_phi::SparsityPhi;
pub use sparsity_theta::SparsityTheta;
pub use top_tokens::TopTokens;
