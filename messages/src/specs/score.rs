use serde::{Deserialize, Serialize};

/// The specification for the `Score` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Perplexity {
        #[serde(default)]
        class_ids: Vec<String>,
    },
    SparsityPhi {
        #[serde(default)]
        class_ids: Vec<String>,
        #[serde(default = "default_eps")]
        eps: f32,
    },
    SparsityTheta {
        #[serde(default = "default_eps")]
        eps: f32,
    },
    ItemsProcessed,
    TopTokens {
        #[serde(default = "default_num_tokens")]
        num_tokens: usize,
        #[serde(default)]
        class_id: Option<String>,
    },
}

impl ScoreKind {
    /// A stable name for this kind of score.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Perplexity { .. } => "perplexity",
            Self::SparsityPhi { .. } => "sparsity_phi",
            Self::SparsityTheta { .. } => "sparsity_theta",
            Self::ItemsProcessed => "items_processed",
            Self::TopTokens { .. } => "top_tokens",
        }
    }
}

/// A named score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub name: String,
    pub kind: ScoreKind,
}

fn default_eps() -> f32 {
    1e-37
}

fn default_num_tokens() -> usize {
    10
}
