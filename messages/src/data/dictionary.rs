use serde::{Deserialize, Serialize};

use super::Token;

/// The aggregate statistics of a single token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub token: Token,
    /// Relative frequency of the token within the collection.
    pub value: f32,
    /// Term frequency, total occurrences across the collection.
    pub tf: f32,
    /// Document frequency, amount of documents the token occurs in.
    pub df: f32,
}

/// The transferable form of a dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryData {
    pub name: String,
    pub entries: Vec<DictionaryEntry>,
    pub num_items: u64,
}
