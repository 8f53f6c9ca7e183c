mod dictionary;
mod store;

pub use dictionary::{Dictionary, FilterOptions};
pub use store::DictionaryStore;
