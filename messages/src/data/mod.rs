mod batch;
mod dictionary;
mod info;
mod model;
mod score;
mod theta;

pub use batch::{Batch, Item, Token};
pub use dictionary::{DictionaryData, DictionaryEntry};
pub use info::{
    BatchInfo, CacheEntryInfo, DictionaryInfo, MasterComponentInfo, ModelInfo, RegularizerInfo,
    ScoreInfo,
};
pub use model::TopicModelData;
pub use score::{ScoreArray, ScoreData, ScoreValue, TopicTokens};
pub use theta::ThetaMatrix;
