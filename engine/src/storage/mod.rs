mod batch_store;
mod disk;
mod model_store;
mod topic_model;

pub use batch_store::{BatchStore, load_batch, save_batch, validate_batch};
pub(crate) use disk::{read_payload, write_payload};
pub use model_store::ModelStore;
pub use topic_model::TopicModel;
