//! Structured payloads exchanged with the master component engine.
//!
//! Every configuration, operation argument and result crossing the engine's
//! boundary is one of the types in this crate, encoded with a [`Format`].

pub mod args;
mod codec;
pub mod data;
mod error;
pub mod specs;

pub use codec::Format;
pub use error::{CodecErr, Result};

/// The modality assigned to tokens that carry no explicit class id.
pub const DEFAULT_CLASS: &str = "@default_class";
