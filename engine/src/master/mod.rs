//! The master component: the models, dictionaries, batches and caches of one
//! topic model instance together with the operations driving it.
//!
//! Mutating operations are serialized per component, read only operations run
//! against the last published snapshots.

mod attach;
mod component;
mod models;
mod retrieval;
mod training;

pub use attach::AttachedModel;
pub use component::MasterComponent;
