//! A concurrent engine fitting additively regularized topic models.
//!
//! Every topic model instance lives in a [`master::MasterComponent`] addressed by
//! a [`MasterHandle`]. Callers drive them through a [`Client`], whose operations
//! exchange encoded payloads of the `messages` crate.

pub mod api;
pub mod cache;
pub mod config;
pub mod dictionary;
mod error;
pub mod initialization;
mod logging;
pub mod master;
pub mod operations;
mod parser;
pub mod processing;
pub mod registry;
pub mod regularization;
pub mod scores;
pub mod storage;
pub mod training;

pub use api::{Client, Engine};
pub use config::EngineConfig;
pub use error::{EngineErr, ErrorKind, Result};
pub use logging::configure_logging;
pub use master::{AttachedModel, MasterComponent};
pub use operations::{OperationId, OperationState};
pub use parser::parse_collection;
pub use registry::MasterHandle;
