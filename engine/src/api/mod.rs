//! The handle based boundary of the engine.
//!
//! An [`Engine`] maps handles to master components, a [`Client`] is one call
//! context over it: it decodes argument payloads, encodes results into its
//! pending result slot and remembers the last failure. The `*_external`
//! requests split dense matrices out into a second requested object slot.

mod client;
mod engine;
mod external;
mod pending;

pub use client::Client;
pub use engine::Engine;
pub use pending::PendingResult;
