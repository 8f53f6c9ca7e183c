use serde::{Deserialize, Serialize};

/// The specification for the `Regularizer` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularizerKind {
    /// Adds `tau` (scaled by the dictionary value of the token, if any) to every
    /// selected phi cell. A negative `tau` sparses, a positive one smooths.
    SmoothSparsePhi {
        #[serde(default)]
        topic_names: Vec<String>,
        #[serde(default)]
        class_ids: Vec<String>,
        #[serde(default)]
        dictionary_name: Option<String>,
    },
    /// Adds `tau` (scaled by `alpha_iter[iteration]`, if given) to every selected theta cell.
    SmoothSparseTheta {
        #[serde(default)]
        topic_names: Vec<String>,
        #[serde(default)]
        alpha_iter: Vec<f32>,
    },
    /// Pushes the selected topics apart by penalizing tokens shared among them.
    DecorrelatorPhi {
        #[serde(default)]
        topic_names: Vec<String>,
        #[serde(default)]
        class_ids: Vec<String>,
    },
}

impl RegularizerKind {
    /// A stable name for this kind of regularizer.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SmoothSparsePhi { .. } => "smooth_sparse_phi",
            Self::SmoothSparseTheta { .. } => "smooth_sparse_theta",
            Self::DecorrelatorPhi { .. } => "decorrelator_phi",
        }
    }
}

/// A named, weighted regularizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularizerConfig {
    pub name: String,
    pub tau: f32,
    pub kind: RegularizerKind,
}
