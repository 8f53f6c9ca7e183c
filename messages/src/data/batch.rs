use serde::{Deserialize, Serialize};

use crate::DEFAULT_CLASS;

/// A token of the vocabulary, scoped to its modality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token {
    pub class_id: String,
    pub keyword: String,
}

impl Token {
    /// Creates a new `Token`.
    pub fn new(class_id: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            keyword: keyword.into(),
        }
    }

    /// Creates a new `Token` of the default class.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self::new(DEFAULT_CLASS, keyword)
    }
}

/// A single document, every `token_ids[i]` indexes the owning batch's token list
/// and occurs `token_weights[i]` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    pub token_ids: Vec<u32>,
    pub token_weights: Vec<f32>,
}

/// An immutable group of documents sharing a local vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub tokens: Vec<String>,
    /// Either empty or one class id per token.
    #[serde(default)]
    pub class_ids: Vec<String>,
    pub items: Vec<Item>,
}

impl Batch {
    /// The class id of the `i`-th token of the batch.
    pub fn class_of(&self, i: usize) -> &str {
        self.class_ids.get(i).map_or(DEFAULT_CLASS, String::as_str)
    }

    /// The `i`-th token of the batch scoped to its class, if it exists.
    pub fn token(&self, i: usize) -> Option<Token> {
        self.tokens
            .get(i)
            .map(|keyword| Token::new(self.class_of(i), keyword.as_str()))
    }
}
